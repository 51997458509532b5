use std::collections::HashSet;

use async_trait::async_trait;

use crate::device::{DeviceSnapshot, RoutePoint};

use super::types::{NewDevice, NewPosition};
use super::Result;

/// Durable source of truth for device metadata and raw positions.
///
/// All read methods return denormalized rows already ordered by display
/// name (device lists) or newest-first (position history), so callers
/// never re-sort.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Lists active devices joined with person metadata and each
    /// device's most recent position.
    ///
    /// With `visible_to = Some(user_id)` only devices granted to that
    /// user are returned and `limit` is ignored (the grant set bounds
    /// the result). With `visible_to = None` the full fleet is
    /// returned, capped at `limit`.
    async fn list_devices_with_latest_position(
        &self,
        visible_to: Option<i64>,
        limit: usize,
    ) -> Result<Vec<DeviceSnapshot>>;

    /// The set of device ids the user has been granted access to.
    async fn list_device_grants(&self, user_id: i64) -> Result<HashSet<String>>;

    /// Live single-device lookup. Returns `None` when the device does
    /// not exist or is inactive.
    async fn get_device(&self, device_id: &str) -> Result<Option<DeviceSnapshot>>;

    /// Raw position log for one device since the given epoch-ms
    /// timestamp, newest first, rows with usable coordinates only,
    /// capped at `limit`.
    async fn raw_position_history(
        &self,
        device_id: &str,
        since_epoch_ms: i64,
        limit: usize,
    ) -> Result<Vec<RoutePoint>>;

    /// Registers a device if it is not already known. Existing rows
    /// are left untouched.
    async fn upsert_device(&self, device: &NewDevice) -> Result<()>;

    /// Appends one raw position report.
    async fn insert_position(&self, position: &NewPosition) -> Result<()>;
}
