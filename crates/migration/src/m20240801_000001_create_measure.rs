//! Create `measure` table.
//! One row per meter reading; the raw image lives on disk, referenced by file name.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Measure::Table)
                    .if_not_exists()
                    .col(pk_auto(Measure::Id))
                    .col(uuid_uniq(Measure::Uuid))
                    .col(string_len(Measure::CustomerCode, 128).not_null())
                    .col(string_len(Measure::MeasureType, 8).not_null())
                    .col(timestamp_with_time_zone(Measure::MeasureDatetime).not_null())
                    .col(string_len(Measure::MeasureMonth, 7).not_null())
                    .col(big_integer(Measure::MeasureValue).not_null())
                    .col(boolean(Measure::MeasureConfirmed).not_null().default(false))
                    .col(string_len(Measure::ImageFile, 255).not_null())
                    .col(timestamp_with_time_zone(Measure::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Measure::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Measure::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Measure {
    Table,
    Id,
    Uuid,
    CustomerCode,
    MeasureType,
    MeasureDatetime,
    MeasureMonth,
    MeasureValue,
    MeasureConfirmed,
    ImageFile,
    CreatedAt,
    UpdatedAt,
}
