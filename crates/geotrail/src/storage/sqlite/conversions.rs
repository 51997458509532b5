//! Row mapping between SQLite rows and core types.
//!
//! Coordinates are stored as REAL and rendered to decimal strings here,
//! at the storage boundary, so every layer above works with strings.

use rusqlite::Row;

use geotrail_core::device::{decimal_string, DeviceSnapshot, RoutePoint};

/// Renders an optional REAL coordinate as an optional decimal string.
pub fn optional_decimal(value: Option<f64>) -> Option<String> {
    value.map(decimal_string)
}

/// Maps one row of the device-with-latest-position column list.
///
/// Works for the unscoped, user-scoped and single-device queries, which
/// all select identical columns.
pub fn row_to_device_snapshot(row: &Row) -> rusqlite::Result<DeviceSnapshot> {
    Ok(DeviceSnapshot {
        device_id: row.get(0)?,
        device_name: row.get(1)?,
        device_icon: row.get(2)?,
        device_type: row.get(3)?,
        is_primary: row.get::<_, i64>(4)? != 0,
        person_id: row.get(5)?,
        person_name: row.get(6)?,
        latitude: optional_decimal(row.get(7)?),
        longitude: optional_decimal(row.get(8)?),
        readable_datetime: row.get(9)?,
        timestamp: row.get(10)?,
        battery_level: row.get(11)?,
        battery_status: row.get(12)?,
    })
}

/// Maps one position log row. The history query filters out rows with
/// missing coordinates or timestamps, so those columns are non-null here.
pub fn row_to_route_point(row: &Row) -> rusqlite::Result<RoutePoint> {
    Ok(RoutePoint {
        latitude: decimal_string(row.get(0)?),
        longitude: decimal_string(row.get(1)?),
        readable_datetime: row.get(2)?,
        timestamp: row.get(3)?,
        horizontal_accuracy: row.get(4)?,
        battery_level: row.get(5)?,
    })
}
