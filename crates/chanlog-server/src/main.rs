use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use chanlog_server::config::ServerConfig;
use chanlog_server::routes;
use chanlog_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("chanlog=info".parse()?))
        .with_target(false)
        .init();

    let config = ServerConfig::from_env()?;
    if config.bot_token.is_none() {
        tracing::warn!("CHANLOG_BOT_TOKEN is not set; export submissions will be rejected");
    }

    let state = Arc::new(AppState::from_config(&config).context("Failed to build API client")?);

    let app = routes::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(export_dir = %config.export_dir.display(), "Starting server on {addr}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
