mod config;
mod dashboard;
mod db;
mod errors;
mod routes;
mod schema;
mod state;
mod submission;
#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::dashboard::HttpDashboard;
use crate::db::create_pool;
use crate::routes::build_router;
use crate::state::AppState;
use crate::submission::persister::ensure_applications_table;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting campus intake v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;
    ensure_applications_table(&db)
        .await
        .context("Failed to prepare applications table")?;

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", config.upload_dir.display()))?;
    info!("Upload folder: {}", config.upload_dir.display());

    let dashboard = HttpDashboard::new(
        config.dashboard_url.clone(),
        config.health_timeout,
        config.remote_timeout,
    )?;
    info!("Dashboard client targeting {}", config.dashboard_url);

    info!(
        "Uploads limited to {} bytes ({}); persist mode {:?}",
        config.max_upload_bytes,
        config.allowed_extensions.join(", "),
        config.persist_mode
    );

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    let state = AppState {
        db,
        dashboard: Arc::new(dashboard),
        config: Arc::new(config),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
