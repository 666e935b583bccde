use async_trait::async_trait;
use models::measure::{MeasureType, NewMeasure};
use uuid::Uuid;

use super::domain::MeasureRecord;
use crate::errors::ServiceError;

/// Repository abstraction for reading persistence.
#[async_trait]
pub trait MeasureRepository: Send + Sync {
    /// The reading of a customer and type in a `YYYY-MM` month, if any.
    async fn find_in_month(
        &self,
        customer_code: &str,
        measure_type: MeasureType,
        month: &str,
    ) -> Result<Option<MeasureRecord>, ServiceError>;

    /// Insert an unconfirmed reading; a second one in the same month is `DoubleReport`.
    async fn insert(&self, new: NewMeasure) -> Result<MeasureRecord, ServiceError>;

    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<MeasureRecord>, ServiceError>;

    /// Set the value and the confirmed flag if still unconfirmed; returns whether it changed.
    async fn confirm(&self, uuid: Uuid, value: i64) -> Result<bool, ServiceError>;

    /// Readings of a customer ordered by `measure_datetime`.
    async fn list(
        &self,
        customer_code: &str,
        measure_type: Option<MeasureType>,
    ) -> Result<Vec<MeasureRecord>, ServiceError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use models::measure::month_key;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockMeasureRepository {
        rows: Mutex<Vec<MeasureRecord>>,
    }

    impl MockMeasureRepository {
        pub fn len(&self) -> usize {
            self.rows.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        pub fn get(&self, uuid: Uuid) -> Option<MeasureRecord> {
            self.rows.lock().unwrap().iter().find(|r| r.uuid == uuid).cloned()
        }
    }

    fn same_slot(r: &MeasureRecord, customer_code: &str, measure_type: MeasureType, month: &str) -> bool {
        r.customer_code == customer_code && r.measure_type == measure_type && month_key(&r.measure_datetime) == month
    }

    #[async_trait]
    impl MeasureRepository for MockMeasureRepository {
        async fn find_in_month(
            &self,
            customer_code: &str,
            measure_type: MeasureType,
            month: &str,
        ) -> Result<Option<MeasureRecord>, ServiceError> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().find(|r| same_slot(r, customer_code, measure_type, month)).cloned())
        }

        async fn insert(&self, new: NewMeasure) -> Result<MeasureRecord, ServiceError> {
            let mut rows = self.rows.lock().unwrap();
            // same rule as the unique index on (customer_code, measure_type, measure_month)
            let month = month_key(&new.measure_datetime);
            if rows.iter().any(|r| same_slot(r, &new.customer_code, new.measure_type, &month)) {
                return Err(ServiceError::DoubleReport);
            }
            let record = MeasureRecord {
                uuid: new.uuid,
                customer_code: new.customer_code,
                measure_type: new.measure_type,
                measure_datetime: new.measure_datetime,
                measure_value: new.measure_value,
                confirmed: false,
                image_file: new.image_file,
            };
            rows.push(record.clone());
            Ok(record)
        }

        async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<MeasureRecord>, ServiceError> {
            Ok(self.get(uuid))
        }

        async fn confirm(&self, uuid: Uuid, value: i64) -> Result<bool, ServiceError> {
            let mut rows = self.rows.lock().unwrap();
            match rows.iter_mut().find(|r| r.uuid == uuid && !r.confirmed) {
                Some(r) => {
                    r.measure_value = value;
                    r.confirmed = true;
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn list(
            &self,
            customer_code: &str,
            measure_type: Option<MeasureType>,
        ) -> Result<Vec<MeasureRecord>, ServiceError> {
            let rows = self.rows.lock().unwrap();
            let mut out: Vec<MeasureRecord> = rows
                .iter()
                .filter(|r| r.customer_code == customer_code)
                .filter(|r| measure_type.map_or(true, |t| r.measure_type == t))
                .cloned()
                .collect();
            out.sort_by_key(|r| r.measure_datetime);
            Ok(out)
        }
    }

}
