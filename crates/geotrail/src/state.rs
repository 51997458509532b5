//! Shared application state.
//!
//! Wires the position store, the cache materializer and the device
//! query service together; cloned into every request handler.

use std::sync::Arc;

use tokio::sync::broadcast;

use geotrail_core::store::PositionStore;

use crate::{
    cache::{CacheArtifact, CacheMaterializer, RefreshStats},
    config::Config,
    service::DeviceQueryService,
    storage::SqlitePositionStore,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Direct store access for the ingest path.
    pub store: Arc<dyn PositionStore>,
    /// Principal-scoped device reads.
    pub devices: DeviceQueryService,
    /// Owned here so main can spawn the scheduled refresh loop.
    pub materializer: Arc<CacheMaterializer>,
    /// Ingest batch size bound, distinct from the batch-read row cap.
    pub ingest_batch_cap: usize,
    /// Shutdown signal sender for background tasks.
    pub shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    /// Builds the state on top of an already-opened store.
    pub fn build(store: Arc<dyn PositionStore>, config: &Config) -> Self {
        let artifact = Arc::new(CacheArtifact::new());
        let stats = Arc::new(RefreshStats::new());
        let materializer = Arc::new(CacheMaterializer::new(
            Arc::clone(&store),
            artifact,
            stats,
            config.freshness_policy(),
            config.store_timeout(),
            config.staff_row_cap,
        ));
        let devices = DeviceQueryService::new(
            Arc::clone(&store),
            Arc::clone(&materializer),
            config.staff_row_cap,
            config.batch_row_cap,
        );
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            store,
            devices,
            materializer,
            ingest_batch_cap: config.ingest_batch_cap,
            shutdown_tx,
        }
    }

    /// Opens the configured SQLite database and builds the state.
    pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
        let store = Arc::new(SqlitePositionStore::new(&config.sqlite_path).await?);
        Ok(Self::build(store, config))
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal background tasks to shut down.
    pub fn signal_shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
