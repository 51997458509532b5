use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

use geotrail_core::device::RefreshOutcome;

const MAX_RECENT_ERRORS: usize = 10;

/// One recorded refresh failure.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshErrorEntry {
    pub at: DateTime<Utc>,
    pub message: String,
    pub duration_ms: u64,
}

/// Refresh statistics collector.
///
/// Injected into the materializer at construction; starts from zero on
/// every process start and has no ambient global. Cheap to record into
/// from the refresh path.
#[derive(Debug, Default)]
pub struct RefreshStats {
    total: AtomicU64,
    successful: AtomicU64,
    last: RwLock<Option<LastRefresh>>,
    recent_errors: RwLock<VecDeque<RefreshErrorEntry>>,
}

#[derive(Debug, Clone)]
struct LastRefresh {
    at: DateTime<Utc>,
    duration_ms: u64,
    rows_affected: usize,
}

/// Serializable view over the collector, reported on the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshStatsReport {
    pub total_refreshes: u64,
    pub successful_refreshes: u64,
    pub success_rate_percent: f64,
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub last_refresh_duration_ms: Option<u64>,
    pub last_refresh_rows: Option<usize>,
    pub recent_errors: Vec<RefreshErrorEntry>,
}

impl RefreshStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one refresh outcome.
    pub fn record(&self, outcome: &RefreshOutcome) {
        self.total.fetch_add(1, Ordering::Relaxed);

        if outcome.success {
            self.successful.fetch_add(1, Ordering::Relaxed);
            if let Ok(mut last) = self.last.write() {
                *last = Some(LastRefresh {
                    at: Utc::now(),
                    duration_ms: outcome.duration_ms,
                    rows_affected: outcome.rows_affected,
                });
            }
        } else if let Ok(mut errors) = self.recent_errors.write() {
            errors.push_back(RefreshErrorEntry {
                at: Utc::now(),
                message: outcome
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
                duration_ms: outcome.duration_ms,
            });
            while errors.len() > MAX_RECENT_ERRORS {
                errors.pop_front();
            }
        }
    }

    pub fn report(&self) -> RefreshStatsReport {
        let total = self.total.load(Ordering::Relaxed);
        let successful = self.successful.load(Ordering::Relaxed);
        let last = self.last.read().ok().and_then(|l| l.clone());
        let recent_errors = self
            .recent_errors
            .read()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default();

        RefreshStatsReport {
            total_refreshes: total,
            successful_refreshes: successful,
            success_rate_percent: if total > 0 {
                successful as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            last_refresh_at: last.as_ref().map(|l| l.at),
            last_refresh_duration_ms: last.as_ref().map(|l| l.duration_ms),
            last_refresh_rows: last.as_ref().map(|l| l.rows_affected),
            recent_errors,
        }
    }
}
