use models::measure::{self, MeasureType, NewMeasure};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::measure::domain::MeasureRecord;
use crate::measure::repository::MeasureRepository;

pub struct SeaOrmMeasureRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmMeasureRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl MeasureRepository for SeaOrmMeasureRepository {
    async fn find_in_month(
        &self,
        customer_code: &str,
        measure_type: MeasureType,
        month: &str,
    ) -> Result<Option<MeasureRecord>, ServiceError> {
        let found = measure::find_for_month(&self.db, customer_code, measure_type, month).await?;
        Ok(found.map(MeasureRecord::from))
    }

    async fn insert(&self, new: NewMeasure) -> Result<MeasureRecord, ServiceError> {
        Ok(measure::create(&self.db, new).await?.into())
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<MeasureRecord>, ServiceError> {
        Ok(measure::find_by_uuid(&self.db, uuid).await?.map(MeasureRecord::from))
    }

    async fn confirm(&self, uuid: Uuid, value: i64) -> Result<bool, ServiceError> {
        Ok(measure::confirm(&self.db, uuid, value).await?)
    }

    async fn list(
        &self,
        customer_code: &str,
        measure_type: Option<MeasureType>,
    ) -> Result<Vec<MeasureRecord>, ServiceError> {
        let rows = measure::list_for_customer(&self.db, customer_code, measure_type).await?;
        Ok(rows.into_iter().map(MeasureRecord::from).collect())
    }
}
