use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use service::measure::domain::{ConfirmOutcome, CustomerMeasures, UploadOutcome};

use crate::errors::ApiError;
use crate::metrics;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub measure_type: Option<String>,
}

#[utoipa::path(post, path = "/upload", tag = "measures", request_body = crate::openapi::UploadRequest,
    responses(
        (status = 200, description = "Reading stored", body = crate::openapi::UploadResponse),
        (status = 400, description = "INVALID_DATA", body = crate::openapi::ErrorResponse),
        (status = 409, description = "DOUBLE_REPORT", body = crate::openapi::ErrorResponse)
    ))]
pub async fn upload(
    State(state): State<ServerState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<UploadOutcome>, ApiError> {
    let Json(payload) = body.map_err(ApiError::from_rejection)?;
    let out = state.measures.upload(&payload).await?;
    metrics::UPLOADS_TOTAL.inc();
    metrics::EXTRACTIONS_TOTAL.with_label_values(&[out.extraction.as_label()]).inc();
    Ok(Json(out))
}

#[utoipa::path(patch, path = "/confirm", tag = "measures", request_body = crate::openapi::ConfirmRequest,
    responses(
        (status = 200, description = "Reading confirmed", body = crate::openapi::ConfirmResponse),
        (status = 400, description = "INVALID_DATA", body = crate::openapi::ErrorResponse),
        (status = 404, description = "MEASURE_NOT_FOUND", body = crate::openapi::ErrorResponse),
        (status = 409, description = "ALREADY_CONFIRMED", body = crate::openapi::ErrorResponse)
    ))]
pub async fn confirm(
    State(state): State<ServerState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ConfirmOutcome>, ApiError> {
    let Json(payload) = body.map_err(ApiError::from_rejection)?;
    let out = state.measures.confirm(&payload).await?;
    metrics::CONFIRMS_TOTAL.inc();
    Ok(Json(out))
}

#[utoipa::path(get, path = "/{customer_code}/list", tag = "measures",
    params(
        ("customer_code" = String, Path, description = "Customer whose readings are listed"),
        ("measure_type" = Option<String>, Query, description = "WATER or GAS, any case")
    ),
    responses(
        (status = 200, description = "Readings of the customer", body = crate::openapi::ListResponse),
        (status = 400, description = "INVALID_DATA", body = crate::openapi::ErrorResponse),
        (status = 404, description = "MEASURES_NOT_FOUND", body = crate::openapi::ErrorResponse)
    ))]
pub async fn list(
    State(state): State<ServerState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<CustomerMeasures>, ApiError> {
    let Path(customer_code) = path.map_err(ApiError::from_path_rejection)?;
    let Query(query) = query.map_err(ApiError::from_query_rejection)?;
    let out = state.measures.list(&customer_code, query.measure_type.as_deref()).await?;
    Ok(Json(out))
}
