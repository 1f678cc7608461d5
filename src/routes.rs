use crate::state::AppState;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub fn configure_routes(state: AppState) -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", axum::routing::get(|| async { "ok" }))
        .merge(crate::modules::chat::router(state))
        .layer(cors)
}
