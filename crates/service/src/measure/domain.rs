use chrono::{DateTime, Utc};
use models::measure::MeasureType;
use serde::Serialize;
use uuid::Uuid;

use crate::storage::DecodedImage;
use crate::vision::ExtractionOutcome;

/// Validated upload request.
#[derive(Debug, Clone)]
pub struct UploadInput {
    pub customer_code: String,
    pub measure_type: MeasureType,
    pub measure_datetime: DateTime<Utc>,
    pub image: DecodedImage,
}

/// Validated confirmation request. The uuid stays textual; an unparseable
/// one simply matches no reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmInput {
    pub measure_uuid: String,
    pub measure_value: i64,
}

/// Validated list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter {
    pub customer_code: String,
    pub measure_type: Option<MeasureType>,
}

/// A stored reading (business view).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureRecord {
    pub uuid: Uuid,
    pub customer_code: String,
    pub measure_type: MeasureType,
    pub measure_datetime: DateTime<Utc>,
    pub measure_value: i64,
    pub confirmed: bool,
    pub image_file: String,
}

impl From<models::measure::Model> for MeasureRecord {
    fn from(m: models::measure::Model) -> Self {
        Self {
            uuid: m.uuid,
            customer_code: m.customer_code,
            measure_type: m.measure_type,
            measure_datetime: m.measure_datetime.with_timezone(&Utc),
            measure_value: m.measure_value,
            confirmed: m.measure_confirmed,
            image_file: m.image_file,
        }
    }
}

/// Upload result
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub image_url: String,
    pub measure_value: i64,
    pub measure_uuid: Uuid,
    #[serde(skip)]
    pub extraction: ExtractionOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmOutcome {
    pub success: bool,
}

/// One entry of a customer's listing.
#[derive(Debug, Clone, Serialize)]
pub struct MeasureSummary {
    pub uuid: Uuid,
    pub measure_datetime: DateTime<Utc>,
    pub measure_type: MeasureType,
    pub has_confirmed: bool,
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerMeasures {
    pub customer_code: String,
    pub measures: Vec<MeasureSummary>,
}
