use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::env;

use crate::runtime::AppState;

/// Bearer-token guard for the execution routes.
///
/// The key is read from the env var named by `server.api_key_env` on every
/// request. When that variable is unset or empty the routes are open.
pub async fn api_key_auth(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let expected = match env::var(&state.engine.config.server.api_key_env) {
        Ok(v) if !v.is_empty() => v,
        _ => return next.run(req).await,
    };

    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match auth_header {
        Some(value) if value == format!("Bearer {}", expected) => next.run(req).await,
        _ => {
            tracing::warn!(path = %req.uri().path(), "rejected request without valid API key");
            (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
    }
}
