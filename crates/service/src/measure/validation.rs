//! Request payload validation.
//!
//! Every check reports one human-readable message per violated field, in a
//! fixed field order, and never stops at the first problem.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use models::measure::{MeasureType, MAX_CUSTOMER_CODE_LEN};
use serde_json::{Map, Value};

use super::domain::{ConfirmInput, ListFilter, UploadInput};
use crate::errors::ServiceError;
use crate::storage::{decode_base64_image, DecodedImage};

/// Fields known to the validator, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Image,
    CustomerCode,
    MeasureDatetime,
    MeasureType,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Image, Field::CustomerCode, Field::MeasureDatetime, Field::MeasureType];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Image => "image",
            Field::CustomerCode => "customer_code",
            Field::MeasureDatetime => "measure_datetime",
            Field::MeasureType => "measure_type",
        }
    }
}

const NOT_AN_OBJECT: &str = "request body must be a JSON object";

fn check_image(v: &Value) -> Result<DecodedImage, String> {
    v.as_str()
        .and_then(decode_base64_image)
        .ok_or_else(|| "image must be a base64 encoded image (jpeg, png, webp, gif or heic)".to_string())
}

fn check_customer_code(v: &Value) -> Result<String, String> {
    match v.as_str() {
        Some(s) if s.trim().is_empty() => Err("customer_code must be a non-empty string".into()),
        Some(s) if s.len() > MAX_CUSTOMER_CODE_LEN => {
            Err(format!("customer_code must be at most {MAX_CUSTOMER_CODE_LEN} characters"))
        }
        Some(s) => Ok(s.to_string()),
        None => Err("customer_code must be a non-empty string".into()),
    }
}

/// Date-times without an offset, taken as UTC. `%.f` also matches no fraction.
const NAIVE_FORMATS: [&str; 4] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Date-times with a numeric offset that RFC 3339 does not cover.
const OFFSET_FORMATS: [&str; 4] = ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M%z", "%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M%:z"];

fn parse_naive(s: &str) -> Option<DateTime<Utc>> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// ISO 8601 date or date-time: RFC 3339, minute precision, a space instead of
/// `T`, a `Z` or numeric offset or none (UTC), or a plain date at midnight UTC.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = OFFSET_FORMATS.iter().find_map(|fmt| DateTime::parse_from_str(s, fmt).ok()) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(utc) = s.strip_suffix(['Z', 'z']) {
        return parse_naive(utc);
    }
    if let Some(dt) = parse_naive(s) {
        return Some(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn check_datetime(v: &Value) -> Result<DateTime<Utc>, String> {
    v.as_str()
        .and_then(parse_datetime)
        .ok_or_else(|| "measure_datetime must be a valid ISO 8601 date or date-time".to_string())
}

fn check_measure_type(v: &Value, case_insensitive: bool) -> Result<MeasureType, String> {
    v.as_str()
        .and_then(|s| MeasureType::parse(s, case_insensitive))
        .ok_or_else(|| "measure_type must be WATER or GAS".to_string())
}

/// Look a field up, recording a message when it is missing (and required) or invalid.
fn take<T>(
    obj: &Map<String, Value>,
    field: Field,
    required: bool,
    errors: &mut Vec<String>,
    check: impl FnOnce(&Value) -> Result<T, String>,
) -> Option<T> {
    match obj.get(field.name()) {
        None | Some(Value::Null) => {
            if required {
                errors.push(format!("{} is required", field.name()));
            }
            None
        }
        Some(v) => check(v).map_err(|msg| errors.push(msg)).ok(),
    }
}

/// Typed values of the fields that passed their checks.
#[derive(Debug)]
struct Checked {
    image: Option<DecodedImage>,
    customer_code: Option<String>,
    measure_datetime: Option<DateTime<Utc>>,
    measure_type: Option<MeasureType>,
}

fn check_fields(obj: &Map<String, Value>, required: &[Field], case_insensitive: bool) -> (Checked, Vec<String>) {
    let mut errors = Vec::new();
    let req = |field: Field| required.contains(&field);
    // struct fields are evaluated in order, which keeps the messages in field order
    let checked = Checked {
        image: take(obj, Field::Image, req(Field::Image), &mut errors, check_image),
        customer_code: take(obj, Field::CustomerCode, req(Field::CustomerCode), &mut errors, check_customer_code),
        measure_datetime: take(obj, Field::MeasureDatetime, req(Field::MeasureDatetime), &mut errors, check_datetime),
        measure_type: take(obj, Field::MeasureType, req(Field::MeasureType), &mut errors, |v| {
            check_measure_type(v, case_insensitive)
        }),
    };
    (checked, errors)
}

/// Validate the known fields present in `payload` and report the `required`
/// ones that are absent. An empty result means the payload is valid.
///
/// # Examples
/// ```
/// use service::measure::validation::{validate_data, Field};
/// let payload = serde_json::json!({ "customer_code": "C1", "measure_type": "water" });
/// assert!(validate_data(&payload, &[Field::CustomerCode], true).is_empty());
/// assert_eq!(validate_data(&payload, &[Field::CustomerCode], false).len(), 1);
/// ```
pub fn validate_data(payload: &Value, required: &[Field], case_insensitive: bool) -> Vec<String> {
    match payload.as_object() {
        Some(obj) => check_fields(obj, required, case_insensitive).1,
        None => vec![NOT_AN_OBJECT.to_string()],
    }
}

/// Upload requires all four fields and compares `measure_type` exactly.
pub fn parse_upload(payload: &Value) -> Result<UploadInput, ServiceError> {
    let obj = payload.as_object().ok_or_else(|| ServiceError::invalid(NOT_AN_OBJECT))?;
    let (checked, errors) = check_fields(obj, &Field::ALL, false);

    match checked {
        Checked {
            image: Some(image),
            customer_code: Some(customer_code),
            measure_datetime: Some(measure_datetime),
            measure_type: Some(measure_type),
        } if errors.is_empty() => Ok(UploadInput { customer_code, measure_type, measure_datetime, image }),
        _ => Err(ServiceError::InvalidData(errors)),
    }
}

/// A JSON integer, or a float with no fractional part that fits in `i64`.
fn whole_number(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| {
        v.as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

pub fn parse_confirm(payload: &Value) -> Result<ConfirmInput, ServiceError> {
    let obj = payload.as_object().ok_or_else(|| ServiceError::invalid(NOT_AN_OBJECT))?;
    let mut errors = Vec::new();

    let measure_uuid = match obj.get("measure_uuid") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        None | Some(Value::Null) => {
            errors.push("measure_uuid is required".to_string());
            None
        }
        Some(_) => {
            errors.push("measure_uuid must be a non-empty string".to_string());
            None
        }
    };
    let measure_value = match obj.get("measure_value") {
        Some(v @ Value::Number(_)) => whole_number(v).or_else(|| {
            errors.push("measure_value must be an integer".to_string());
            None
        }),
        None | Some(Value::Null) => {
            errors.push("measure_value is required".to_string());
            None
        }
        Some(_) => {
            errors.push("measure_value must be an integer".to_string());
            None
        }
    };

    match (measure_uuid, measure_value) {
        (Some(measure_uuid), Some(measure_value)) => Ok(ConfirmInput { measure_uuid, measure_value }),
        _ => Err(ServiceError::InvalidData(errors)),
    }
}

/// List validates in partial mode with case-insensitive types; an empty
/// `measure_type` counts as absent.
pub fn parse_list(customer_code: &str, measure_type: Option<&str>) -> Result<ListFilter, ServiceError> {
    let mut obj = Map::new();
    obj.insert(Field::CustomerCode.name().into(), Value::String(customer_code.to_string()));
    if let Some(t) = measure_type.map(str::trim).filter(|t| !t.is_empty()) {
        obj.insert(Field::MeasureType.name().into(), Value::String(t.to_string()));
    }

    let (checked, errors) = check_fields(&obj, &[Field::CustomerCode], true);
    match checked.customer_code {
        Some(customer_code) if errors.is_empty() => Ok(ListFilter { customer_code, measure_type: checked.measure_type }),
        _ => Err(ServiceError::InvalidData(errors)),
    }
}
