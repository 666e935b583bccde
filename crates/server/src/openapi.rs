use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct ErrorResponse { pub error_code: String, pub error_description: String }

/// `measure_type` is `WATER` or `GAS`.
#[derive(ToSchema)]
pub struct UploadRequest {
    /// Base64 image, optionally prefixed with `data:image/<subtype>;base64,`.
    pub image: String,
    pub customer_code: String,
    /// ISO 8601 date or date-time.
    pub measure_datetime: String,
    pub measure_type: String,
}

#[derive(ToSchema)]
pub struct UploadResponse {
    /// Signed, time-limited link to the stored image.
    pub image_url: String,
    /// Automated reading, `-1` when none could be extracted.
    pub measure_value: i64,
    pub measure_uuid: Uuid,
}

#[derive(ToSchema)]
pub struct ConfirmRequest { pub measure_uuid: String, pub measure_value: i64 }

#[derive(ToSchema)]
pub struct ConfirmResponse { pub success: bool }

#[derive(ToSchema)]
pub struct MeasureSummaryDoc {
    pub uuid: Uuid,
    pub measure_datetime: String,
    pub measure_type: String,
    pub has_confirmed: bool,
    pub image_url: String,
}

#[derive(ToSchema)]
pub struct ListResponse { pub customer_code: String, pub measures: Vec<MeasureSummaryDoc> }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::measures::upload,
        crate::routes::measures::confirm,
        crate::routes::measures::list,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            UploadRequest,
            UploadResponse,
            ConfirmRequest,
            ConfirmResponse,
            MeasureSummaryDoc,
            ListResponse,
        )
    ),
    tags(
        (name = "health"),
        (name = "measures")
    )
)]
pub struct ApiDoc;
