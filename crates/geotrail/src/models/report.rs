//! Inbound device report payloads.
//!
//! Reporting agents post camelCase JSON, either a single report, a bare
//! array, or a `{"data": [...]}` wrapper. Everything here is normalized
//! into the store's `NewDevice` / `NewPosition` pair.

use chrono::{TimeZone, Utc};
use serde::Deserialize;

use geotrail_core::serde::deserialize_optional_string;
use geotrail_core::store::{NewDevice, NewPosition};

/// One position report from a tracking agent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportItem {
    pub serial_number: String,
    #[serde(default)]
    pub name: Option<ReportName>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub device_display_name: Option<String>,
    #[serde(default)]
    pub location: Option<ReportLocation>,
    #[serde(default)]
    pub address: Option<ReportAddress>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub position_type: Option<String>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub time_stamp: Option<i64>,
    #[serde(default)]
    pub battery: Option<ReportBattery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportName {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLocation {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub floor_level: Option<i64>,
    #[serde(default)]
    pub horizontal_accuracy: Option<f64>,
    #[serde(default)]
    pub vertical_accuracy: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportAddress {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub street: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub locality: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportBattery {
    #[serde(default)]
    pub level: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub status: Option<String>,
}

impl ReportItem {
    /// Device registration derived from the report. Falls back to the
    /// serial number when the agent sent no label.
    pub fn to_new_device(&self) -> NewDevice {
        let name = self
            .name
            .as_ref()
            .and_then(|n| n.label.clone())
            .unwrap_or_else(|| self.serial_number.clone());
        let icon = self
            .name
            .as_ref()
            .and_then(|n| n.emoji.clone())
            .unwrap_or_default();

        NewDevice {
            device_id: self.serial_number.clone(),
            name,
            icon,
            device_type: self.device_display_name.clone().unwrap_or_default(),
        }
    }

    /// Raw position log row derived from the report.
    pub fn to_new_position(&self) -> NewPosition {
        let location = self.location.as_ref();
        let address = self.address.as_ref();
        let battery = self.battery.as_ref();

        NewPosition {
            device_id: self.serial_number.clone(),
            latitude: location.and_then(|l| l.latitude),
            longitude: location.and_then(|l| l.longitude),
            altitude: location.and_then(|l| l.altitude),
            floor_level: location.and_then(|l| l.floor_level),
            horizontal_accuracy: location.and_then(|l| l.horizontal_accuracy),
            vertical_accuracy: location.and_then(|l| l.vertical_accuracy),
            position_type: self.position_type.clone().unwrap_or_default(),
            address: address.and_then(|a| a.street.clone()).unwrap_or_default(),
            city: address.and_then(|a| a.locality.clone()).unwrap_or_default(),
            country: address.and_then(|a| a.country.clone()).unwrap_or_default(),
            timestamp: self.time_stamp,
            readable_datetime: self.time_stamp.and_then(readable_datetime),
            battery_level: battery.and_then(|b| b.level),
            battery_status: battery.and_then(|b| b.status.clone()).unwrap_or_default(),
        }
    }
}

/// Renders epoch milliseconds as `YYYY-MM-DD HH:MM:SS` in UTC.
fn readable_datetime(epoch_ms: i64) -> Option<String> {
    Utc.timestamp_millis_opt(epoch_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// The accepted shapes of an ingest request body.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ReportBatch {
    Wrapped { data: Vec<ReportItem> },
    List(Vec<ReportItem>),
    Single(Box<ReportItem>),
}

impl ReportBatch {
    pub fn into_items(self) -> Vec<ReportItem> {
        match self {
            ReportBatch::Wrapped { data } => data,
            ReportBatch::List(items) => items,
            ReportBatch::Single(item) => vec![*item],
        }
    }
}
