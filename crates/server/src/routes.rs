pub mod measures;
pub mod temp_images;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;

use common::crypto::TEMP_IMAGES_PATH;
use common::types::Health;

use crate::metrics::{self, encode_metrics};
use crate::openapi::ApiDoc;
use crate::state::ServerState;

/// Upload bodies carry a base64 photograph.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics_handler() -> (axum::http::StatusCode, String) {
    encode_metrics()
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the full application router: reading endpoints, signed image links, ops endpoints
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    metrics::init();

    // Signed images, gated by the link token
    let images = Router::new()
        .nest_service(TEMP_IMAGES_PATH, ServeDir::new(state.measures.images().dir()))
        .layer(middleware::from_fn_with_state(state.clone(), temp_images::require_link_token));

    // Ops routes (health, metrics, docs)
    let ops = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .route("/api-docs/openapi.json", get(openapi_json));

    // Reading routes
    let api = Router::new()
        .route("/upload", post(measures::upload))
        .route("/confirm", patch(measures::confirm))
        .route("/:customer_code/list", get(measures::list))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state);

    ops.merge(api)
        .merge(images)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
