use anyhow::Context;
use backend::api::{self, AppState};
use backend::config::ServerConfig;
use backend::gateway::spawn_clock_sweep;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env().context("invalid server configuration")?;
    tracing::info!(?config, "starting game server");

    let state = AppState::new(&config);
    spawn_clock_sweep(Arc::clone(&state.gateway), config.tick_interval);

    let app = api::router(state);
    let listener = TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.http_addr))?;
    tracing::info!(addr = %config.http_addr, "API listening");
    axum::serve(listener, app).await?;
    Ok(())
}
