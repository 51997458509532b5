//! SQLite position store implementation.
//!
//! Implements `PositionStore` from `geotrail_core::store` using SQLite.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio_rusqlite::Connection;

use geotrail_core::device::{DeviceSnapshot, RoutePoint};
use geotrail_core::store::{NewDevice, NewPosition, PositionStore, Result, StoreError};

use super::conversions::{row_to_device_snapshot, row_to_route_point};
use super::error::{map_tokio_rusqlite_error, map_tokio_rusqlite_error_with_id};
use super::schema;

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// SQLite-backed position store.
///
/// One background connection serves all queries; tokio_rusqlite
/// serializes access to it.
pub struct SqlitePositionStore {
    conn: Connection,
}

impl SqlitePositionStore {
    /// Opens a file-based database, creating it and the schema when
    /// missing.
    pub async fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Opens an in-memory database. Data is lost when the connection is
    /// dropped; used by tests and demo runs.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    async fn init_schema(conn: &Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
                .map_err(wrap_err)?;
            conn.execute_batch(schema::CREATE_TABLES).map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))
    }

    /// Creates a person row and returns its id. Seeding helper.
    pub async fn insert_person(&self, name: &str, emoji: Option<&str>) -> Result<i64> {
        let name = name.to_string();
        let emoji = emoji.map(str::to_string);

        self.conn
            .call(move |conn| {
                conn.execute(schema::INSERT_PERSON, rusqlite::params![name, emoji])
                    .map_err(wrap_err)?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Person"))
    }

    /// Attaches a device to a person. Seeding helper.
    pub async fn assign_device_to_person(
        &self,
        device_id: &str,
        person_id: i64,
        is_primary: bool,
    ) -> Result<()> {
        let device_id = device_id.to_string();
        let owned_id = device_id.clone();

        self.conn
            .call(move |conn| {
                let rows = conn
                    .execute(
                        schema::ASSIGN_DEVICE_TO_PERSON,
                        rusqlite::params![device_id, person_id, is_primary as i64],
                    )
                    .map_err(wrap_err)?;
                if rows == 0 {
                    Err(wrap_err(rusqlite::Error::QueryReturnedNoRows))
                } else {
                    Ok(())
                }
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Device", owned_id))
    }

    /// Grants a user visibility of a device. Granting twice is a no-op.
    pub async fn grant_access(&self, user_id: i64, device_id: &str) -> Result<()> {
        let device_id = device_id.to_string();
        let owned_id = device_id.clone();

        self.conn
            .call(move |conn| {
                conn.execute(schema::INSERT_GRANT, rusqlite::params![user_id, device_id])
                    .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Device", owned_id))
    }
}

#[async_trait]
impl PositionStore for SqlitePositionStore {
    async fn list_devices_with_latest_position(
        &self,
        visible_to: Option<i64>,
        limit: usize,
    ) -> Result<Vec<DeviceSnapshot>> {
        let limit = limit as i64;

        self.conn
            .call(move |conn| {
                let mut devices = Vec::new();
                match visible_to {
                    Some(user_id) => {
                        let mut stmt = conn
                            .prepare(schema::SELECT_DEVICES_WITH_LATEST_FOR_USER)
                            .map_err(wrap_err)?;
                        let rows = stmt
                            .query_map([user_id], row_to_device_snapshot)
                            .map_err(wrap_err)?;
                        for row_result in rows {
                            devices.push(row_result.map_err(wrap_err)?);
                        }
                    }
                    None => {
                        let mut stmt = conn
                            .prepare(schema::SELECT_DEVICES_WITH_LATEST)
                            .map_err(wrap_err)?;
                        let rows = stmt
                            .query_map([limit], row_to_device_snapshot)
                            .map_err(wrap_err)?;
                        for row_result in rows {
                            devices.push(row_result.map_err(wrap_err)?);
                        }
                    }
                }
                Ok(devices)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Device"))
    }

    async fn list_device_grants(&self, user_id: i64) -> Result<HashSet<String>> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(schema::SELECT_DEVICE_GRANTS).map_err(wrap_err)?;
                let rows = stmt
                    .query_map([user_id], |row| row.get::<_, String>(0))
                    .map_err(wrap_err)?;

                let mut grants = HashSet::new();
                for row_result in rows {
                    grants.insert(row_result.map_err(wrap_err)?);
                }
                Ok(grants)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Device"))
    }

    async fn get_device(&self, device_id: &str) -> Result<Option<DeviceSnapshot>> {
        let device_id = device_id.to_string();
        let owned_id = device_id.clone();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(schema::SELECT_DEVICE_BY_ID).map_err(wrap_err)?;
                match stmt.query_row([&device_id], row_to_device_snapshot) {
                    Ok(device) => Ok(Some(device)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(wrap_err(e)),
                }
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Device", owned_id))
    }

    async fn raw_position_history(
        &self,
        device_id: &str,
        since_epoch_ms: i64,
        limit: usize,
    ) -> Result<Vec<RoutePoint>> {
        let device_id = device_id.to_string();
        let owned_id = device_id.clone();
        let limit = limit as i64;

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(schema::SELECT_POSITION_HISTORY)
                    .map_err(wrap_err)?;
                let rows = stmt
                    .query_map(
                        rusqlite::params![device_id, since_epoch_ms, limit],
                        row_to_route_point,
                    )
                    .map_err(wrap_err)?;

                let mut points = Vec::new();
                for row_result in rows {
                    points.push(row_result.map_err(wrap_err)?);
                }
                Ok(points)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Device", owned_id))
    }

    async fn upsert_device(&self, device: &NewDevice) -> Result<()> {
        let device = device.clone();
        let owned_id = device.device_id.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_DEVICE,
                    rusqlite::params![device.device_id, device.name, device.icon, device.device_type],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Device", owned_id))
    }

    async fn insert_position(&self, position: &NewPosition) -> Result<()> {
        let position = position.clone();
        let owned_id = position.device_id.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_POSITION,
                    rusqlite::params![
                        position.device_id,
                        position.latitude,
                        position.longitude,
                        position.altitude,
                        position.floor_level,
                        position.horizontal_accuracy,
                        position.vertical_accuracy,
                        position.position_type,
                        position.address,
                        position.city,
                        position.country,
                        position.timestamp,
                        position.readable_datetime,
                        position.battery_level,
                        position.battery_status
                    ],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Position", owned_id))
    }
}
