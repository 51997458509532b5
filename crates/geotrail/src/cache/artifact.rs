use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use geotrail_core::device::DeviceSnapshot;

/// One committed cache generation: the full row set and when it was
/// written.
#[derive(Debug, Clone, Default)]
struct Generation {
    rows: Arc<Vec<DeviceSnapshot>>,
    updated_at: Option<DateTime<Utc>>,
}

/// The in-process cache artifact.
///
/// Written exclusively by the materializer via [`CacheArtifact::replace`]
/// and read by everyone else. Readers take an `Arc` to the current row
/// set under a short read lock; a concurrent replace swaps the whole
/// generation, so a reader holds either the pre-refresh or the
/// post-refresh snapshot in full - never a mix.
#[derive(Debug, Default)]
pub struct CacheArtifact {
    inner: RwLock<Generation>,
}

impl CacheArtifact {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot rows and commit time.
    pub async fn read(&self) -> (Arc<Vec<DeviceSnapshot>>, Option<DateTime<Utc>>) {
        let generation = self.inner.read().await;
        (Arc::clone(&generation.rows), generation.updated_at)
    }

    /// Commit time of the current snapshot, `None` before the first
    /// successful refresh.
    pub async fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.updated_at
    }

    pub async fn row_count(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    /// Moves the commit time into the past. Test hook for staleness
    /// scenarios.
    #[cfg(test)]
    pub async fn backdate(&self, by: chrono::Duration) {
        let mut generation = self.inner.write().await;
        generation.updated_at = generation.updated_at.map(|t| t - by);
    }

    /// Atomically replaces the whole snapshot and stamps the commit
    /// time. Only called by the materializer, and only with a fully
    /// recomputed row set.
    pub async fn replace(&self, rows: Vec<DeviceSnapshot>) -> usize {
        let count = rows.len();
        let mut generation = self.inner.write().await;
        *generation = Generation {
            rows: Arc::new(rows),
            updated_at: Some(Utc::now()),
        };
        count
    }
}
