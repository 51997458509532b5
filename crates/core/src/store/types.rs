use serde::{Deserialize, Serialize};

/// Device registration payload, written with insert-if-absent semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDevice {
    pub device_id: String,
    pub name: String,
    pub icon: String,
    pub device_type: String,
}

/// One raw position report as appended to the position log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPosition {
    pub device_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub floor_level: Option<i64>,
    pub horizontal_accuracy: Option<f64>,
    pub vertical_accuracy: Option<f64>,
    pub position_type: String,
    pub address: String,
    pub city: String,
    pub country: String,
    /// Epoch milliseconds as reported by the device.
    pub timestamp: Option<i64>,
    /// UTC timestamp rendered as `YYYY-MM-DD HH:MM:SS`.
    pub readable_datetime: Option<String>,
    pub battery_level: Option<f64>,
    pub battery_status: String,
}
