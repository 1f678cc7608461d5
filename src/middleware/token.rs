use crate::common::response::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};

/// Every transport route requires the configured access token, either as
/// `Authorization: Bearer <token>` or, for WebSocket clients that cannot set
/// headers, as a `token` query parameter.
pub async fn token_guard(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header_token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| auth_value.strip_prefix("Bearer ").map(str::to_owned));

    let query_token = req
        .uri()
        .query()
        .and_then(|q| q.split('&').find_map(|pair| pair.strip_prefix("token=")))
        .map(str::to_owned);

    match header_token.or(query_token) {
        Some(token) if token == state.config.bot_token => Ok(next.run(req).await),
        _ => Err(ApiError(
            "Unauthorized: missing or invalid access token".to_string(),
            StatusCode::UNAUTHORIZED,
        )),
    }
}
