use axum::{extract::State, Json};
use serde::Serialize;

use geotrail_core::device::{FreshnessReport, RefreshOutcome};

use crate::{cache::RefreshStatsReport, service::DeviceAccessError, state::AppState};

use super::principal::CurrentPrincipal;

/// Trigger a cache refresh (POST /api/cache/refresh). Staff only.
pub async fn refresh_cache(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<RefreshOutcome>, DeviceAccessError> {
    let outcome = state.devices.refresh_now(principal).await?;
    Ok(Json(outcome))
}

/// Current cache freshness (GET /api/cache/freshness).
pub async fn get_freshness(State(state): State<AppState>) -> Json<FreshnessReport> {
    Json(state.devices.check_freshness().await)
}

#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    #[serde(flatten)]
    pub stats: RefreshStatsReport,
    pub freshness: FreshnessReport,
}

/// Refresh statistics since process start, plus current freshness
/// (GET /api/cache/stats).
pub async fn get_stats(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    Json(CacheStatsResponse {
        stats: state.devices.refresh_stats(),
        freshness: state.devices.check_freshness().await,
    })
}
