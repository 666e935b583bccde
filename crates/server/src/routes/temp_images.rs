use std::collections::HashMap;

use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::debug;

use crate::errors::ApiError;
use crate::metrics;
use crate::state::ServerState;

/// Let the request through only with a valid, unexpired `token` query parameter.
pub async fn require_link_token(State(state): State<ServerState>, req: Request, next: Next) -> Response {
    let token = Query::<HashMap<String, String>>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(mut params)| params.remove("token"));

    let rejection = match token {
        Some(token) => match state.measures.signer().verify(&token, Utc::now()) {
            Ok(_) => return next.run(req).await,
            Err(e) => Some(e),
        },
        None => None,
    };

    metrics::LINK_REJECTIONS_TOTAL.inc();
    debug!(path = %req.uri().path(), reason = ?rejection, "image link rejected");
    ApiError::invalid_token(rejection).into_response()
}
