use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use common::crypto::TokenError;
use service::errors::ServiceError;

const INTERNAL_DESCRIPTION: &str = "internal server error";

/// Error body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error_code: &'static str,
    pub error_description: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub description: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, description: impl Into<String>) -> Self {
        Self { status, code, description: description.into() }
    }

    fn invalid_request(what: &str, detail: String) -> Self {
        debug!(error = %detail, part = what, "request rejected");
        Self::new(StatusCode::BAD_REQUEST, "INVALID_DATA", detail)
    }

    /// Malformed or missing JSON body.
    pub fn from_rejection(rejection: JsonRejection) -> Self {
        Self::invalid_request("json body", rejection.body_text())
    }

    pub fn from_path_rejection(rejection: PathRejection) -> Self {
        Self::invalid_request("path", rejection.body_text())
    }

    pub fn from_query_rejection(rejection: QueryRejection) -> Self {
        Self::invalid_request("query string", rejection.body_text())
    }

    pub fn invalid_token(e: Option<TokenError>) -> Self {
        let description = match e {
            Some(e) => e.to_string(),
            None => "token is missing".to_string(),
        };
        Self::new(StatusCode::FORBIDDEN, "INVALID_TOKEN", description)
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        let status = match &e {
            ServiceError::InvalidData(_) => StatusCode::BAD_REQUEST,
            ServiceError::DoubleReport | ServiceError::AlreadyConfirmed => StatusCode::CONFLICT,
            ServiceError::MeasureNotFound | ServiceError::MeasuresNotFound => StatusCode::NOT_FOUND,
            ServiceError::Storage(_) | ServiceError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let description = match &e {
            _ if e.is_internal() => {
                error!(error = %e, "request failed");
                INTERNAL_DESCRIPTION.to_string()
            }
            ServiceError::InvalidData(messages) => messages.join("; "),
            other => other.to_string(),
        };
        Self::new(status, e.code(), description)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error_code: self.code, error_description: self.description };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}
