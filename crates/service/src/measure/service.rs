use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::crypto::LinkSigner;
use models::measure::{month_key, NewMeasure};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::domain::{ConfirmOutcome, CustomerMeasures, MeasureSummary, UploadOutcome};
use super::repository::MeasureRepository;
use super::validation;
use crate::errors::ServiceError;
use crate::storage::{ImageStore, StoredImage};
use crate::vision::{ExtractionOutcome, MeterReader, MeterReading, NO_READING};

/// Link and extraction settings of the reading service.
#[derive(Debug, Clone)]
pub struct MeasureSettings {
    /// Base of the signed image links, e.g. `http://localhost:3000`.
    pub public_base_url: String,
    pub link_ttl: chrono::Duration,
    pub extraction_timeout: Duration,
}

impl MeasureSettings {
    pub fn from_config(cfg: &configs::AppConfig) -> Self {
        Self {
            public_base_url: cfg.server.public_base_url(),
            link_ttl: chrono::Duration::seconds(cfg.links.ttl_secs as i64),
            extraction_timeout: Duration::from_secs(cfg.vision.timeout_secs),
        }
    }
}

impl Default for MeasureSettings {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:3000".into(),
            link_ttl: chrono::Duration::hours(1),
            extraction_timeout: Duration::from_secs(30),
        }
    }
}

/// Meter reading business service independent of web framework
pub struct MeasureService {
    repo: Arc<dyn MeasureRepository>,
    reader: Arc<dyn MeterReader>,
    images: ImageStore,
    signer: LinkSigner,
    settings: MeasureSettings,
}

impl MeasureService {
    pub fn new(
        repo: Arc<dyn MeasureRepository>,
        reader: Arc<dyn MeterReader>,
        images: ImageStore,
        signer: LinkSigner,
        settings: MeasureSettings,
    ) -> Self {
        Self { repo, reader, images, signer, settings }
    }

    pub fn signer(&self) -> &LinkSigner {
        &self.signer
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    fn image_url(&self, file_name: &str) -> String {
        let expires_at = Utc::now() + self.settings.link_ttl;
        self.signer.signed_url(&self.settings.public_base_url, file_name, expires_at)
    }

    /// Store a meter photograph and its automated reading.
    ///
    /// A failed or inconclusive extraction does not fail the upload; the
    /// reading is stored as `-1` and the outcome is reported separately.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use base64::Engine as _;
    /// use common::crypto::LinkSigner;
    /// use service::measure::{MeasureService, MeasureSettings, repository::mock::MockMeasureRepository};
    /// use service::storage::ImageStore;
    /// use service::vision::mock::StaticMeterReader;
    ///
    /// let dir = std::env::temp_dir().join(format!("meter-reader-doc-{}", uuid::Uuid::new_v4()));
    /// let svc = MeasureService::new(
    ///     Arc::new(MockMeasureRepository::default()),
    ///     Arc::new(StaticMeterReader::text("Reading: 1234 m³")),
    ///     ImageStore::new(&dir),
    ///     LinkSigner::new("secret"),
    ///     MeasureSettings::default(),
    /// );
    /// let jpeg = base64::engine::general_purpose::STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0]);
    /// let payload = serde_json::json!({
    ///     "image": jpeg, "customer_code": "C1",
    ///     "measure_datetime": "2024-05-10T12:00:00Z", "measure_type": "WATER"
    /// });
    /// let out = tokio_test::block_on(svc.upload(&payload)).unwrap();
    /// assert_eq!(out.measure_value, 1234);
    /// ```
    #[instrument(skip_all)]
    pub async fn upload(&self, payload: &Value) -> Result<UploadOutcome, ServiceError> {
        let input = validation::parse_upload(payload)?;
        let month = month_key(&input.measure_datetime);

        if let Some(existing) = self
            .repo
            .find_in_month(&input.customer_code, input.measure_type, &month)
            .await?
        {
            info!(customer_code = %input.customer_code, measure_type = %input.measure_type, %month, existing = %existing.uuid, "double_report");
            return Err(ServiceError::DoubleReport);
        }

        let measure_uuid = Uuid::new_v4();
        let stored = self.images.save(measure_uuid, &input.image).await?;
        let image_url = self.image_url(&stored.file_name);
        let (measure_value, extraction) = self.extract(&stored).await;

        let inserted = self
            .repo
            .insert(NewMeasure {
                uuid: measure_uuid,
                customer_code: input.customer_code,
                measure_type: input.measure_type,
                measure_datetime: input.measure_datetime,
                measure_value,
                image_file: stored.file_name.clone(),
            })
            .await;
        let record = match inserted {
            Ok(record) => record,
            Err(e) => {
                // no reading points at the file
                self.images.remove(&stored).await;
                return Err(e);
            }
        };

        info!(
            measure_uuid = %record.uuid,
            customer_code = %record.customer_code,
            measure_type = %record.measure_type,
            measure_value,
            extraction = extraction.as_label(),
            "measure_uploaded"
        );
        Ok(UploadOutcome { image_url, measure_value: record.measure_value, measure_uuid: record.uuid, extraction })
    }

    /// Ask the vision service for a reading, bounded by the extraction timeout.
    async fn extract(&self, image: &StoredImage) -> (i64, ExtractionOutcome) {
        let call = self.reader.read_meter(&image.path, image.kind.mime());
        match tokio::time::timeout(self.settings.extraction_timeout, call).await {
            Ok(Ok(MeterReading::Value(v))) => {
                debug!(value = v, "meter reading extracted");
                (v, ExtractionOutcome::Value)
            }
            Ok(Ok(MeterReading::NoDigitsFound)) => {
                warn!(file = %image.file_name, "vision answer holds no digits");
                (NO_READING, ExtractionOutcome::NoDigits)
            }
            Ok(Err(e)) => {
                error!(file = %image.file_name, error = %e, "vision service failed");
                (NO_READING, ExtractionOutcome::ServiceError)
            }
            Err(_) => {
                warn!(file = %image.file_name, timeout = ?self.settings.extraction_timeout, "vision service timed out");
                (NO_READING, ExtractionOutcome::Timeout)
            }
        }
    }

    /// Replace the automated value with the customer's and mark the reading confirmed.
    #[instrument(skip_all)]
    pub async fn confirm(&self, payload: &Value) -> Result<ConfirmOutcome, ServiceError> {
        let input = validation::parse_confirm(payload)?;
        let uuid = Uuid::parse_str(&input.measure_uuid).map_err(|_| ServiceError::MeasureNotFound)?;

        let record = self.repo.find_by_uuid(uuid).await?.ok_or(ServiceError::MeasureNotFound)?;
        if record.confirmed {
            return Err(ServiceError::AlreadyConfirmed);
        }
        // a concurrent confirm may have won since the lookup
        if !self.repo.confirm(uuid, input.measure_value).await? {
            return Err(ServiceError::AlreadyConfirmed);
        }

        info!(measure_uuid = %uuid, previous = record.measure_value, measure_value = input.measure_value, "measure_confirmed");
        Ok(ConfirmOutcome { success: true })
    }

    /// Readings of a customer, optionally of one type, each with a fresh image link.
    #[instrument(skip(self))]
    pub async fn list(&self, customer_code: &str, measure_type: Option<&str>) -> Result<CustomerMeasures, ServiceError> {
        let filter = validation::parse_list(customer_code, measure_type)?;
        let records = self.repo.list(&filter.customer_code, filter.measure_type).await?;
        if records.is_empty() {
            return Err(ServiceError::MeasuresNotFound);
        }

        let measures = records
            .into_iter()
            .map(|r| MeasureSummary {
                image_url: self.image_url(&r.image_file),
                uuid: r.uuid,
                measure_datetime: r.measure_datetime,
                measure_type: r.measure_type,
                has_confirmed: r.confirmed,
            })
            .collect::<Vec<_>>();
        debug!(count = measures.len(), "measures listed");
        Ok(CustomerMeasures { customer_code: filter.customer_code, measures })
    }
}
