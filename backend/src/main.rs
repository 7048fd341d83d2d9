use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;

mod config;
mod error;
mod handlers;
mod models;
mod router;
mod service;
mod store;

use crate::config::{Config, PUBLIC_DIR};
use crate::service::InventoryService;
use crate::store::FileStore;

/// Shared application state. Cheap to clone (all heap behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub service: InventoryService,
    /// `host:port` used for `photo_url` when a request carries no Host header.
    pub fallback_host: Arc<str>,
    pub public_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args()?;

    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,inventory_api=debug")),
        )
        .with_target(false)
        .compact()
        .init();

    let store = FileStore::open(config.cache_dir())
        .await
        .with_context(|| format!("cannot prepare cache directory {}", config.cache_dir().display()))?;
    info!(
        document = %store.document_path().display(),
        uploads = %store.uploads_dir().display(),
        "Inventory store ready"
    );

    let state = AppState {
        service: InventoryService::new(Arc::new(store)),
        fallback_host: config.addr().into(),
        public_dir: PathBuf::from(PUBLIC_DIR),
    };

    let app = router::build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot listen on {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    info!("Shutdown signal received");
}
