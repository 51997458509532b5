use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use geotrail_core::device::{DeviceSnapshot, RoutePoint};

use crate::{
    error::AppError,
    service::{DeviceAccessError, DeviceListing},
    state::AppState,
};

use super::principal::CurrentPrincipal;

/// List visible devices with their latest positions (GET /api/devices).
pub async fn list_devices(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<DeviceListing>, AppError> {
    let listing = state.devices.get_devices(principal).await?;
    Ok(Json(listing))
}

/// Live position of one device (GET /api/devices/{device_id}/position).
pub async fn get_device_position(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceSnapshot>, DeviceAccessError> {
    let snapshot = state
        .devices
        .get_single_device_position(principal, &device_id)
        .await?;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    /// Trailing window in hours, 1 to 168.
    #[serde(default = "default_hours")]
    pub hours: u32,
    #[serde(default = "default_route_limit")]
    pub limit: usize,
}

fn default_hours() -> u32 {
    24
}

fn default_route_limit() -> usize {
    500
}

#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub points: Vec<RoutePoint>,
    pub count: usize,
}

/// Raw route history for one device (GET /api/devices/{device_id}/route).
pub async fn get_device_route(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(device_id): Path<String>,
    Query(query): Query<RouteQuery>,
) -> Result<Json<RouteResponse>, DeviceAccessError> {
    let points = state
        .devices
        .get_device_route(principal, &device_id, query.hours, query.limit)
        .await?;
    let count = points.len();
    Ok(Json(RouteResponse { points, count }))
}

#[derive(Debug, Deserialize)]
pub struct MapQuery {
    /// Comma-separated device id subset.
    pub device_ids: Option<String>,
    pub exclude_device_id: Option<String>,
}

/// Batched cached positions for the map view (GET /api/map/positions).
///
/// Serves straight from the cache artifact without triggering a refresh,
/// so a map poll can never stampede the store.
pub async fn get_map_positions(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Query(query): Query<MapQuery>,
) -> Result<Json<Vec<DeviceSnapshot>>, AppError> {
    let subset: Option<Vec<String>> = query.device_ids.as_deref().map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    });

    let devices = state
        .devices
        .get_batch_positions(
            principal,
            subset.as_deref(),
            query.exclude_device_id.as_deref(),
        )
        .await?;
    Ok(Json(devices))
}
