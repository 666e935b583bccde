use sea_orm_migration::prelude::*;

use crate::m20240801_000001_create_measure::Measure;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One reading per customer, type and calendar month
        manager
            .create_index(
                Index::create()
                    .name("idx_measure_customer_type_month")
                    .table(Measure::Table)
                    .col(Measure::CustomerCode)
                    .col(Measure::MeasureType)
                    .col(Measure::MeasureMonth)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Listing by customer
        manager
            .create_index(
                Index::create()
                    .name("idx_measure_customer")
                    .table(Measure::Table)
                    .col(Measure::CustomerCode)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_measure_customer").table(Measure::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_measure_customer_type_month").table(Measure::Table).to_owned())
            .await
    }
}
