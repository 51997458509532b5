//! Health check endpoints for Kubernetes-style probes.
//!
//! - `/livez` - Basic liveness probe (immediate 200, no checks)
//! - `/healthz` - Cache freshness summary (fast, passive stats)

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::state::AppState;

/// GET /livez - Basic liveness probe.
///
/// Returns 200 immediately. Used to check if the server is accepting
/// connections; does not touch the store or the cache.
#[axum::debug_handler]
pub async fn livez() -> StatusCode {
    StatusCode::OK
}

/// GET /healthz - Cache freshness summary (passive, no store query).
///
/// Reports 200 while the cache snapshot is within its staleness
/// ceiling, 503 once it is stale and unable to serve trustworthy data.
#[axum::debug_handler]
pub async fn healthz(State(state): State<AppState>) -> Response {
    let freshness = state.devices.check_freshness().await;

    let status = if freshness.is_stale {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status, Json(freshness)).into_response()
}
