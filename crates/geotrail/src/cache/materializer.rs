use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};

use geotrail_core::device::{FreshnessPolicy, FreshnessReport, RefreshOutcome};
use geotrail_core::store::{PositionStore, StoreError};

use super::artifact::CacheArtifact;
use super::stats::RefreshStats;

/// Recomputes the full device snapshot from the position store and
/// commits it to the cache artifact.
///
/// Invoked both by the scheduled background task and on demand by the
/// read path when staleness is detected. Concurrent refreshes are
/// serialized by an internal guard; a caller that acquires the guard
/// after another refresh just committed skips the recompute and reports
/// the committed row count, so overlapping triggers coalesce into one
/// store query.
pub struct CacheMaterializer {
    store: Arc<dyn PositionStore>,
    artifact: Arc<CacheArtifact>,
    stats: Arc<RefreshStats>,
    policy: FreshnessPolicy,
    store_timeout: Duration,
    /// Upper bound on snapshot size, matching the unscoped query cap.
    source_row_cap: usize,
    refresh_guard: Mutex<()>,
}

impl CacheMaterializer {
    pub fn new(
        store: Arc<dyn PositionStore>,
        artifact: Arc<CacheArtifact>,
        stats: Arc<RefreshStats>,
        policy: FreshnessPolicy,
        store_timeout: Duration,
        source_row_cap: usize,
    ) -> Self {
        Self {
            store,
            artifact,
            stats,
            policy,
            store_timeout,
            source_row_cap,
            refresh_guard: Mutex::new(()),
        }
    }

    pub fn artifact(&self) -> &Arc<CacheArtifact> {
        &self.artifact
    }

    pub fn stats(&self) -> &Arc<RefreshStats> {
        &self.stats
    }

    pub fn policy(&self) -> &FreshnessPolicy {
        &self.policy
    }

    /// Evaluates cache freshness right now. Cheap; safe on every request.
    pub async fn freshness(&self) -> FreshnessReport {
        let (rows, updated_at) = self.artifact.read().await;
        self.policy.evaluate(updated_at, Utc::now(), rows.len())
    }

    /// Recomputes and atomically replaces the cache snapshot.
    ///
    /// Never returns an error: store failures and timeouts become a
    /// failed [`RefreshOutcome`] and the previous snapshot stays
    /// servable.
    pub async fn refresh(&self) -> RefreshOutcome {
        let requested_at = Utc::now();
        let started = Instant::now();

        let _guard = self.refresh_guard.lock().await;

        // Another refresh may have committed while this caller waited
        // on the guard; serving its snapshot is as good as recomputing.
        if let Some(committed) = self.artifact.last_updated().await {
            if committed >= requested_at {
                let rows = self.artifact.row_count().await;
                tracing::debug!(rows, "Refresh coalesced with a just-committed run");
                return RefreshOutcome::ok(started.elapsed().as_millis() as u64, rows);
            }
        }

        let fetched = tokio::time::timeout(
            self.store_timeout,
            self.store
                .list_devices_with_latest_position(None, self.source_row_cap),
        )
        .await;

        let outcome = match fetched {
            Ok(Ok(rows)) => {
                let count = self.artifact.replace(rows).await;
                let outcome = RefreshOutcome::ok(started.elapsed().as_millis() as u64, count);
                tracing::info!(
                    rows = count,
                    duration_ms = outcome.duration_ms,
                    "Device cache refreshed"
                );
                outcome
            }
            Ok(Err(err)) => {
                let outcome =
                    RefreshOutcome::failed(started.elapsed().as_millis() as u64, err.to_string());
                tracing::warn!(error = %err, "Device cache refresh failed");
                outcome
            }
            Err(_) => {
                let err = StoreError::Timeout(self.store_timeout.as_millis() as u64);
                let outcome =
                    RefreshOutcome::failed(started.elapsed().as_millis() as u64, err.to_string());
                tracing::warn!(error = %err, "Device cache refresh timed out");
                outcome
            }
        };

        self.stats.record(&outcome);
        outcome
    }

    /// Background refresh loop. Ticks at `interval` until the shutdown
    /// signal fires; the first tick runs immediately so the cache is
    /// populated at startup.
    pub async fn run_scheduled(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(interval);

        tracing::info!(interval_secs = interval.as_secs(), "Cache refresh scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = self.refresh().await;
                    if !outcome.success {
                        let report = self.freshness().await;
                        if report.is_stale {
                            tracing::error!(
                                age_seconds = report.age_seconds,
                                "Cache is past its staleness ceiling and the last refresh failed"
                            );
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("Cache refresh scheduler shutting down");
                    break;
                }
            }
        }
    }
}
