use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};

pub mod handler;
pub mod model;
pub mod service;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/ws", get(handler::ws_handler))
        .route(
            "/conversations/{id}/upload",
            post(handler::upload_video),
        )
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::token::token_guard,
        ))
}
