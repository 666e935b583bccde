use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid data: {}", .0.join("; "))]
    InvalidData(Vec<String>),
    #[error("measurement for this month already reported")]
    DoubleReport,
    #[error("measurement not found")]
    MeasureNotFound,
    #[error("no measurements found")]
    MeasuresNotFound,
    #[error("measurement already confirmed")]
    AlreadyConfirmed,
    #[error("storage error: {0}")]
    Storage(String),
    #[error("database error: {0}")]
    Db(String),
}

impl From<models::errors::ModelError> for ServiceError {
    fn from(e: models::errors::ModelError) -> Self {
        match e {
            models::errors::ModelError::Conflict(_) => ServiceError::DoubleReport,
            models::errors::ModelError::Validation(msg) => ServiceError::InvalidData(vec![msg]),
            models::errors::ModelError::Db(msg) => ServiceError::Db(msg),
        }
    }
}

impl ServiceError {
    pub fn invalid(message: impl Into<String>) -> Self { Self::InvalidData(vec![message.into()]) }

    /// Stable code for the `error_code` field of error responses.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidData(_) => "INVALID_DATA",
            ServiceError::DoubleReport => "DOUBLE_REPORT",
            ServiceError::MeasureNotFound => "MEASURE_NOT_FOUND",
            ServiceError::MeasuresNotFound => "MEASURES_NOT_FOUND",
            ServiceError::AlreadyConfirmed => "ALREADY_CONFIRMED",
            ServiceError::Storage(_) | ServiceError::Db(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the error is a server-side fault rather than a client or business outcome.
    pub fn is_internal(&self) -> bool {
        matches!(self, ServiceError::Storage(_) | ServiceError::Db(_))
    }
}
