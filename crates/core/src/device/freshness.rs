use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Process-visible snapshot of cache health.
///
/// Always derived at query time from the cache's last-write timestamp;
/// it has no storage of its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FreshnessReport {
    /// When the cache last committed a full snapshot. `None` before the
    /// first successful refresh.
    pub last_updated: Option<DateTime<Utc>>,
    /// `now - last_updated`, in whole seconds. `None` when the cache
    /// has never been populated.
    pub age_seconds: Option<i64>,
    /// True when the age exceeds the staleness ceiling (or the cache
    /// was never populated).
    pub is_stale: bool,
    pub row_count: usize,
}

/// Staleness thresholds for the device cache.
///
/// Two thresholds on purpose: the serving path proactively refreshes
/// once the cache passes `operational_max_age`, while `is_stale` in
/// reports only flips at the looser `staleness_ceiling`.
#[derive(Debug, Clone, Copy)]
pub struct FreshnessPolicy {
    pub operational_max_age: Duration,
    pub staleness_ceiling: Duration,
}

impl FreshnessPolicy {
    pub fn new(operational_max_age: Duration, staleness_ceiling: Duration) -> Self {
        Self {
            operational_max_age,
            staleness_ceiling,
        }
    }

    /// Evaluates cache health at `now`. Pure computation, no side effects.
    pub fn evaluate(
        &self,
        last_updated: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        row_count: usize,
    ) -> FreshnessReport {
        let age_seconds = last_updated.map(|t| (now - t).num_seconds().max(0));
        let is_stale = match age_seconds {
            Some(age) => age > self.staleness_ceiling.as_secs() as i64,
            // A never-populated cache cannot serve anything.
            None => true,
        };

        FreshnessReport {
            last_updated,
            age_seconds,
            is_stale,
            row_count,
        }
    }

    /// True when the serving path should refresh before reading the cache.
    pub fn needs_refresh(&self, report: &FreshnessReport) -> bool {
        match report.age_seconds {
            Some(age) => report.is_stale || age > self.operational_max_age.as_secs() as i64,
            None => true,
        }
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            operational_max_age: Duration::from_secs(60),
            staleness_ceiling: Duration::from_secs(300),
        }
    }
}
