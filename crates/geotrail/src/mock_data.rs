//! Demo data seeding.
//!
//! Populates an in-memory database with a small fleet so `--demo` runs
//! serve something interesting without a real reporting agent.

use std::collections::HashMap;

use chrono::Utc;

use geotrail_core::store::{NewDevice, NewPosition, PositionStore, Result};

use crate::storage::SqlitePositionStore;

struct DemoDevice {
    device_id: &'static str,
    name: &'static str,
    icon: &'static str,
    device_type: &'static str,
    person: &'static str,
    emoji: &'static str,
    is_primary: bool,
    latitude: f64,
    longitude: f64,
}

const FLEET: &[DemoDevice] = &[
    DemoDevice {
        device_id: "demo-phone-alice",
        name: "Alice's Phone",
        icon: "📱",
        device_type: "phone",
        person: "Alice",
        emoji: "👩",
        is_primary: true,
        latitude: 40.7128,
        longitude: -74.006,
    },
    DemoDevice {
        device_id: "demo-keys-alice",
        name: "Alice's Keys",
        icon: "🔑",
        device_type: "tracker",
        person: "Alice",
        emoji: "👩",
        is_primary: false,
        latitude: 40.7138,
        longitude: -74.0055,
    },
    DemoDevice {
        device_id: "demo-phone-bob",
        name: "Bob's Phone",
        icon: "📱",
        device_type: "phone",
        person: "Bob",
        emoji: "🧔",
        is_primary: true,
        latitude: 51.5074,
        longitude: -0.1278,
    },
];

/// Seeds the demo fleet. User 1 is granted every device; user 2 only
/// Bob's phone, so scoped listings are visibly different.
pub async fn seed_demo(store: &SqlitePositionStore) -> Result<()> {
    let now = Utc::now();
    let mut people: HashMap<&str, i64> = HashMap::new();

    for demo in FLEET {
        store
            .upsert_device(&NewDevice {
                device_id: demo.device_id.to_string(),
                name: demo.name.to_string(),
                icon: demo.icon.to_string(),
                device_type: demo.device_type.to_string(),
            })
            .await?;

        let person_id = match people.get(demo.person) {
            Some(id) => *id,
            None => {
                let id = store.insert_person(demo.person, Some(demo.emoji)).await?;
                people.insert(demo.person, id);
                id
            }
        };
        store
            .assign_device_to_person(demo.device_id, person_id, demo.is_primary)
            .await?;

        // A short trail ending at the device's demo location.
        for minutes_ago in (0..5).rev() {
            let at = now - chrono::Duration::minutes(minutes_ago);
            store
                .insert_position(&NewPosition {
                    device_id: demo.device_id.to_string(),
                    latitude: Some(demo.latitude - minutes_ago as f64 * 0.001),
                    longitude: Some(demo.longitude),
                    altitude: None,
                    floor_level: None,
                    horizontal_accuracy: Some(10.0),
                    vertical_accuracy: None,
                    position_type: "Wifi".to_string(),
                    address: "".to_string(),
                    city: "".to_string(),
                    country: "".to_string(),
                    timestamp: Some(at.timestamp_millis()),
                    readable_datetime: Some(at.format("%Y-%m-%d %H:%M:%S").to_string()),
                    battery_level: Some(0.75),
                    battery_status: "Normal".to_string(),
                })
                .await?;
        }

        store.grant_access(1, demo.device_id).await?;
    }

    store.grant_access(2, "demo-phone-bob").await?;

    tracing::info!(devices = FLEET.len(), "Seeded demo fleet");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotrail_core::store::PositionStore;

    #[tokio::test]
    async fn test_seed_demo_populates_fleet_and_grants() {
        let store = SqlitePositionStore::new_in_memory().await.unwrap();
        seed_demo(&store).await.unwrap();

        let rows = store
            .list_devices_with_latest_position(None, 100)
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.has_position()));
        assert!(rows.iter().all(|r| r.person_name.is_some()));

        let full = store.list_device_grants(1).await.unwrap();
        assert_eq!(full.len(), 3);

        let narrow = store.list_device_grants(2).await.unwrap();
        assert_eq!(narrow.len(), 1);
        assert!(narrow.contains("demo-phone-bob"));
    }
}
