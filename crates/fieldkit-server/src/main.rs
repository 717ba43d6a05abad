//! FieldKit Server — application entry point.

use std::sync::Arc;

use fieldkit_engine::EngineConfig;
use fieldkit_server::{AppState, ServerConfig, build_router};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("fieldkit=info".parse()?),
        )
        .json()
        .init();

    let config = ServerConfig::from_env();

    let manager = fieldkit_db::DbManager::connect(&config.db).await?;
    fieldkit_db::run_migrations(manager.client()).await?;

    let state = Arc::new(AppState::new(
        manager.client().clone(),
        EngineConfig::default(),
    ));
    let app = build_router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "FieldKit server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("FieldKit server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
