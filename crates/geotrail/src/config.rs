use std::{env, time::Duration};

use geotrail_core::device::FreshnessPolicy;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache age past which the serving path refreshes before reading
    /// (default: 60).
    pub operational_max_age_seconds: u64,
    /// Cache age past which freshness reports flip to stale
    /// (default: 300).
    pub staleness_ceiling_seconds: u64,
    /// Background refresh interval in seconds (default: 30).
    pub refresh_interval_seconds: u64,
    /// Bound on any single position store call in milliseconds
    /// (default: 8000).
    pub store_timeout_ms: u64,
    /// Maximum rows returned to an unscoped (staff) device query
    /// (default: 1000).
    pub staff_row_cap: usize,
    /// Maximum rows per batch-position query (default: 100).
    pub batch_row_cap: usize,
    /// Maximum reports accepted from one ingest request (default: 500).
    pub ingest_batch_cap: usize,
    /// Path to the SQLite database file (default: "geotrail.db").
    pub sqlite_path: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `OPERATIONAL_MAX_AGE_SECONDS` - proactive refresh threshold (default: 60)
    /// - `STALENESS_CEILING_SECONDS` - staleness ceiling (default: 300)
    /// - `REFRESH_INTERVAL_SECONDS` - scheduled refresh interval (default: 30)
    /// - `STORE_TIMEOUT_MS` - per-query timeout (default: 8000)
    /// - `STAFF_ROW_CAP` - unscoped query row cap (default: 1000)
    /// - `BATCH_ROW_CAP` - batch-position row cap (default: 100)
    /// - `INGEST_BATCH_CAP` - per-request ingest report cap (default: 500)
    /// - `SQLITE_PATH` - SQLite database path (default: "geotrail.db")
    pub fn from_env() -> Self {
        Self {
            operational_max_age_seconds: env_parse("OPERATIONAL_MAX_AGE_SECONDS", 60),
            staleness_ceiling_seconds: env_parse("STALENESS_CEILING_SECONDS", 300),
            refresh_interval_seconds: env_parse("REFRESH_INTERVAL_SECONDS", 30),
            store_timeout_ms: env_parse("STORE_TIMEOUT_MS", 8000),
            staff_row_cap: env_parse("STAFF_ROW_CAP", 1000),
            batch_row_cap: env_parse("BATCH_ROW_CAP", 100),
            ingest_batch_cap: env_parse("INGEST_BATCH_CAP", 500),
            sqlite_path: env::var("SQLITE_PATH").unwrap_or_else(|_| "geotrail.db".to_string()),
        }
    }

    pub fn freshness_policy(&self) -> FreshnessPolicy {
        FreshnessPolicy::new(
            Duration::from_secs(self.operational_max_age_seconds),
            Duration::from_secs(self.staleness_ceiling_seconds),
        )
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
