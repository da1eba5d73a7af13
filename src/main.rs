//! Siaga - near-real-time flood status for East Jakarta neighborhoods.
//!
//! # API Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Area statuses, most severe first
//! - `GET /status/summary` - Counts per level and the situation sentence
//! - `GET /areas/:name` - One area with its status and forecast
//! - `GET /areas/:name/history` - Stored statuses of one area
//! - `GET /districts` - District names
//! - `GET /weather` - Weather at a point
//! - `POST /analyze` - AI flood analysis for a point
//! - `POST /chat` - AI chat

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use siaga::api::{self, AppState};
use siaga::areas::AreaTable;
use siaga::config::Config;
use siaga::dashboard::{Dashboard, run_refresh_loop};
use siaga::storage::Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("siaga=info".parse()?))
        .init();

    let config = Config::from_env();
    info!(
        port = config.port,
        db_url = %config.database_url,
        refresh_secs = config.refresh_interval.as_secs(),
        "Starting Siaga server"
    );

    let areas = match &config.areas_path {
        Some(path) => AreaTable::from_json_file(path)?,
        None => AreaTable::east_jakarta()?,
    };
    info!(
        areas = areas.len(),
        districts = areas.districts().len(),
        "Area dataset loaded"
    );

    let storage = Storage::new(&config.database_url)
        .await?
        .with_history_limit(config.history_snapshots);
    info!("Database initialized");

    let port = config.port;
    let dashboard = Dashboard::new(config, areas);

    // Serve the last known statuses until the first cycle completes
    match storage.latest_snapshot().await {
        Ok(Some(snapshot)) => {
            info!(computed_at = %snapshot.computed_at, "Restored previous statuses");
            dashboard.publish(Arc::new(snapshot)).await;
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Failed to restore previous statuses"),
    }

    tokio::spawn(run_refresh_loop(dashboard.clone(), storage.clone()));

    let app = api::router(AppState { storage, dashboard });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Siaga is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
