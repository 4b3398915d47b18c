use std::sync::Arc;

use anyhow::Context;
use fridge_layout::{
    config,
    layout::GridGeometry,
    persist::{PositionWriter, RetryPolicy},
    server::{app, AppState},
    store::HttpItemStore,
};
use tokio::signal;
use tracing_subscriber::EnvFilter;

/// How long shutdown waits for queued position writes.
const SHUTDOWN_FLUSH_SECS: u64 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up ITEM_API_URL, GRID_*, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting fridge layout service in {:?} mode", config.environment);

    let geometry = GridGeometry::new(&config.grid).context("invalid grid configuration")?;
    let store = Arc::new(HttpItemStore::new(&config.item_api).context("invalid item API configuration")?);
    let writer = PositionWriter::new(store.clone(), RetryPolicy::from_config(&config.persistence));

    tracing::info!(
        "grid {}x{} cells of {:.1}x{:.1}px, item API at {}",
        geometry.columns,
        geometry.rows,
        geometry.cell_width,
        geometry.cell_height,
        store.base_url()
    );

    let state = AppState::new(geometry, store, writer.clone());
    let app = app(state, &config.server);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    println!("🧊 Fridge layout server listening on http://{}", bind_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    if !writer.flush_timeout(std::time::Duration::from_secs(SHUTDOWN_FLUSH_SECS)).await {
        tracing::warn!("{} position write(s) still pending at shutdown", writer.in_flight());
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
