use serde::{Deserialize, Serialize};

/// Renders a coordinate as a decimal string.
///
/// Clients consume latitude/longitude as strings, so the conversion
/// happens once at row-mapping time and everything downstream passes
/// the string through unchanged.
pub fn decimal_string(value: f64) -> String {
    value.to_string()
}

/// One denormalized row of the device cache: a device joined with its
/// owner and its most recent known position.
///
/// A device with no reported position keeps `None` in every position
/// field but is still listed (name-only visibility).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Unique device identifier within one cache snapshot.
    pub device_id: String,
    pub device_name: String,
    pub device_icon: Option<String>,
    pub device_type: Option<String>,
    pub is_primary: bool,
    pub person_id: Option<i64>,
    pub person_name: Option<String>,
    /// Latest latitude as a decimal string, `None` when unknown.
    pub latitude: Option<String>,
    /// Latest longitude as a decimal string, `None` when unknown.
    pub longitude: Option<String>,
    /// Human-readable timestamp of the latest position (UTC).
    pub readable_datetime: Option<String>,
    /// Epoch milliseconds of the latest position.
    pub timestamp: Option<i64>,
    pub battery_level: Option<f64>,
    pub battery_status: Option<String>,
}

impl DeviceSnapshot {
    /// Returns true when the snapshot carries a usable coordinate pair.
    pub fn has_position(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// One raw position log row, served on the route (trail) endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub latitude: String,
    pub longitude: String,
    pub readable_datetime: Option<String>,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub horizontal_accuracy: Option<f64>,
    pub battery_level: Option<f64>,
}

impl RoutePoint {
    /// Dedup key: two reports are duplicates when coordinates and
    /// timestamp all match.
    pub fn dedup_key(&self) -> (&str, &str, i64) {
        (&self.latitude, &self.longitude, self.timestamp)
    }
}

/// The authenticated entity making a request.
///
/// Authentication itself is external; by the time a principal reaches
/// this crate it has already been verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: i64,
    pub is_staff: bool,
}

impl Principal {
    /// A regular user, subject to per-device access grants.
    pub fn user(user_id: i64) -> Self {
        Self {
            user_id,
            is_staff: false,
        }
    }

    /// An elevated (staff) principal, exempt from grant filtering.
    pub fn staff(user_id: i64) -> Self {
        Self {
            user_id,
            is_staff: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_string_round_trips_common_coordinates() {
        assert_eq!(decimal_string(40.7128), "40.7128");
        assert_eq!(decimal_string(-74.0060), "-74.006");
        assert_eq!(decimal_string(0.0), "0");
    }

    #[test]
    fn test_has_position_requires_both_coordinates() {
        let mut snapshot = DeviceSnapshot {
            device_id: "dev-1".to_string(),
            device_name: "Keys".to_string(),
            device_icon: None,
            device_type: None,
            is_primary: false,
            person_id: None,
            person_name: None,
            latitude: Some("40.7128".to_string()),
            longitude: None,
            readable_datetime: None,
            timestamp: None,
            battery_level: None,
            battery_status: None,
        };
        assert!(!snapshot.has_position());

        snapshot.longitude = Some("-74.006".to_string());
        assert!(snapshot.has_position());
    }

    #[test]
    fn test_route_point_dedup_key_matches_identical_reports() {
        let a = RoutePoint {
            latitude: "1.5".to_string(),
            longitude: "2.5".to_string(),
            readable_datetime: Some("2026-01-01 00:00:00".to_string()),
            timestamp: 1_700_000_000_000,
            horizontal_accuracy: Some(5.0),
            battery_level: Some(80.0),
        };
        let b = RoutePoint {
            horizontal_accuracy: Some(12.0),
            ..a.clone()
        };
        assert_eq!(a.dedup_key(), b.dedup_key());
    }
}
