//! API key authentication middleware.
//!
//! Checks the `X-API-Key` header against the configured key for every
//! request on the `/api` surface. A missing key is distinguished from a
//! wrong one (401 vs 403). When no key is configured, authentication is
//! disabled and requests pass through.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::{error::ApiError, handlers::AppState};

const API_KEY_HEADER: &str = "x-api-key";

pub async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(req).await;
    };

    match req.headers().get(API_KEY_HEADER).and_then(|value| value.to_str().ok()) {
        Some(key) if key == expected => next.run(req).await,
        Some(_) => {
            warn!(path = %req.uri().path(), "Invalid API key attempt");
            ApiError::Forbidden("Invalid API key".to_string()).into_response()
        }
        None => {
            warn!(path = %req.uri().path(), "API access attempt without API key");
            ApiError::Unauthorized(
                "API key required. Include X-API-Key header in your request.".to_string(),
            )
            .into_response()
        }
    }
}
