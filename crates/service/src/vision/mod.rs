//! Meter reading extraction through an external vision model.
//!
//! The model answers in free text; the reading is the first run of decimal
//! digits in that text. Transport and service faults are reported as
//! `VisionError`, distinct from a well-formed answer without digits.

pub mod gemini;

use std::path::Path;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub use gemini::GeminiMeterReader;

/// Instruction sent along with every meter photograph.
pub const METER_PROMPT: &str = "You are a helpful AI bot that analyzes an image of a water or gas meter. \
Your task is to identify and return only the numerical reading from the meter.";

/// Value stored when no reading could be extracted.
pub const NO_READING: i64 = -1;

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("digit pattern compiles"));

/// First contiguous run of ASCII digits, parsed as `i64`.
///
/// # Examples
/// ```
/// use service::vision::extract_first_number;
/// assert_eq!(extract_first_number("Reading: 1234 m³"), Some(1234));
/// assert_eq!(extract_first_number("no number here"), None);
/// ```
pub fn extract_first_number(text: &str) -> Option<i64> {
    DIGITS.find(text).and_then(|m| m.as_str().parse::<i64>().ok())
}

/// Outcome of a successful call to the vision service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterReading {
    Value(i64),
    NoDigitsFound,
}

impl MeterReading {
    pub fn from_text(text: &str) -> Self {
        extract_first_number(text).map_or(MeterReading::NoDigitsFound, MeterReading::Value)
    }
}

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("vision service not configured: missing API key")]
    NotConfigured,
    #[error("cannot read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("vision service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected vision response: {0}")]
    Decode(String),
}

/// How the automated reading of an upload ended; used for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Value,
    NoDigits,
    ServiceError,
    Timeout,
}

impl ExtractionOutcome {
    pub const ALL: [ExtractionOutcome; 4] = [
        ExtractionOutcome::Value,
        ExtractionOutcome::NoDigits,
        ExtractionOutcome::ServiceError,
        ExtractionOutcome::Timeout,
    ];

    pub fn as_label(&self) -> &'static str {
        match self {
            ExtractionOutcome::Value => "value",
            ExtractionOutcome::NoDigits => "no_digits",
            ExtractionOutcome::ServiceError => "service_error",
            ExtractionOutcome::Timeout => "timeout",
        }
    }
}

/// Reads the numeric value off a meter photograph.
#[async_trait]
pub trait MeterReader: Send + Sync {
    async fn read_meter(&self, image: &Path, mime: &str) -> Result<MeterReading, VisionError>;
}

/// Scripted readers for tests and local runs without a vision API key.
pub mod mock {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    pub enum Script {
        /// Answer with this text, parsed like a real model answer.
        Text(String),
        /// Fail as if the service were unreachable.
        Fail(String),
        /// Sleep before answering, to exercise caller timeouts.
        Hang(Duration),
    }

    #[derive(Debug, Clone)]
    pub struct StaticMeterReader {
        script: Script,
    }

    impl StaticMeterReader {
        pub fn text(text: impl Into<String>) -> Self { Self { script: Script::Text(text.into()) } }
        pub fn failing(reason: impl Into<String>) -> Self { Self { script: Script::Fail(reason.into()) } }
        pub fn hanging(d: Duration) -> Self { Self { script: Script::Hang(d) } }
    }

    #[async_trait]
    impl MeterReader for StaticMeterReader {
        async fn read_meter(&self, image: &Path, _mime: &str) -> Result<MeterReading, VisionError> {
            tokio::fs::metadata(image).await?;
            match &self.script {
                Script::Text(t) => Ok(MeterReading::from_text(t)),
                Script::Fail(reason) => Err(VisionError::Transport(reason.clone())),
                Script::Hang(d) => {
                    tokio::time::sleep(*d).await;
                    Ok(MeterReading::NoDigitsFound)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_digit_run_wins() {
        assert_eq!(extract_first_number("Reading: 1234 m³"), Some(1234));
        assert_eq!(extract_first_number("00042 then 77"), Some(42));
        assert_eq!(extract_first_number("abc9"), Some(9));
        assert_eq!(extract_first_number("12.5"), Some(12));
        assert_eq!(extract_first_number("no number here"), None);
        assert_eq!(extract_first_number(""), None);
    }

    #[test]
    fn non_ascii_digits_are_ignored() {
        assert_eq!(extract_first_number("٣٤٥ and 7"), Some(7));
    }

    #[test]
    fn overflowing_run_is_not_a_reading() {
        assert_eq!(extract_first_number("99999999999999999999999"), None);
    }

    #[test]
    fn reading_from_text() {
        assert_eq!(MeterReading::from_text("The meter shows 00815"), MeterReading::Value(815));
        assert_eq!(MeterReading::from_text("I cannot see a meter"), MeterReading::NoDigitsFound);
    }

    #[tokio::test]
    async fn static_reader_scripts() {
        let path = std::env::temp_dir().join(format!("meter-reader-vision-{}.jpg", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"img").await.unwrap();

        let r = mock::StaticMeterReader::text("Reading: 1234 m³");
        assert_eq!(r.read_meter(&path, "image/jpeg").await.unwrap(), MeterReading::Value(1234));

        let r = mock::StaticMeterReader::failing("down");
        assert!(matches!(r.read_meter(&path, "image/jpeg").await, Err(VisionError::Transport(_))));

        let missing = path.with_extension("missing");
        assert!(matches!(r.read_meter(&missing, "image/jpeg").await, Err(VisionError::Io(_))));
        let _ = tokio::fs::remove_file(&path).await;
    }
}
