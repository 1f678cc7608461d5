use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::info;

mod app;
mod common;
mod config;
mod errors;
mod infrastructure;
mod middleware;
mod modules;
mod routes;
mod state;
mod transport;

use config::settings::AppConfig;
use state::AppState;
use transport::ws::{PeerMap, WsTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vidbot=info,tower_http=info".into()),
        )
        .init();

    // The access token is the one fatal configuration value: without it the
    // process must not come up at all.
    let config = AppConfig::new().context("BOT_TOKEN environment variable is not set")?;

    tokio::fs::create_dir_all(config.uploads_dir())
        .await
        .context("failed to create uploads dir")?;
    tokio::fs::create_dir_all(config.outputs_dir())
        .await
        .context("failed to create outputs dir")?;

    let peers = PeerMap::new();
    let transport = Arc::new(WsTransport::new(peers.clone()));
    let state = AppState::new(config.clone(), transport, peers);

    let app = app::create_app(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("🎥 vidbot listening on http://{}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
