//! SQLite schema definitions and SQL query constants.
//!
//! All SQL used by the SQLite position store lives here as pure data.

/// SQL statement to create all tables.
pub const CREATE_TABLES: &str = r#"
-- People who own devices
CREATE TABLE IF NOT EXISTS people (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    emoji TEXT
);

-- Tracked devices
CREATE TABLE IF NOT EXISTS devices (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    icon TEXT NOT NULL DEFAULT '',
    device_type TEXT NOT NULL DEFAULT '',
    is_primary INTEGER NOT NULL DEFAULT 0,
    person_id INTEGER,
    is_active INTEGER NOT NULL DEFAULT 1,
    FOREIGN KEY (person_id) REFERENCES people(id) ON DELETE SET NULL
);

-- Append-only raw position log
CREATE TABLE IF NOT EXISTS positions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    device_id TEXT NOT NULL,
    latitude REAL,
    longitude REAL,
    altitude REAL,
    floor_level INTEGER,
    horizontal_accuracy REAL,
    vertical_accuracy REAL,
    position_type TEXT NOT NULL DEFAULT '',
    address TEXT NOT NULL DEFAULT '',
    city TEXT NOT NULL DEFAULT '',
    country TEXT NOT NULL DEFAULT '',
    timestamp INTEGER,
    readable_datetime TEXT,
    battery_level REAL,
    battery_status TEXT NOT NULL DEFAULT '',
    FOREIGN KEY (device_id) REFERENCES devices(id) ON DELETE CASCADE
);

-- Per-user device visibility grants
CREATE TABLE IF NOT EXISTS user_device_access (
    user_id INTEGER NOT NULL,
    device_id TEXT NOT NULL,
    PRIMARY KEY (user_id, device_id),
    FOREIGN KEY (device_id) REFERENCES devices(id) ON DELETE CASCADE
);

-- Indexes for efficient queries
CREATE INDEX IF NOT EXISTS idx_positions_device_ts ON positions(device_id, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_devices_person_id ON devices(person_id);
CREATE INDEX IF NOT EXISTS idx_user_device_access_user ON user_device_access(user_id);
"#;

// Device listing queries. Both variants produce the same column list so
// one row mapper covers them; the latest-position subquery picks the
// newest log row per device with the row id as a tie-breaker.

pub const SELECT_DEVICES_WITH_LATEST: &str = r#"
SELECT d.id, d.name, d.icon, d.device_type, d.is_primary, p.id, p.name,
       lp.latitude, lp.longitude, lp.readable_datetime, lp.timestamp,
       lp.battery_level, lp.battery_status
FROM devices d
LEFT JOIN people p ON p.id = d.person_id
LEFT JOIN positions lp ON lp.id = (
    SELECT id FROM positions
    WHERE device_id = d.id
    ORDER BY timestamp DESC, id DESC
    LIMIT 1
)
WHERE d.is_active = 1
ORDER BY d.name
LIMIT ?1
"#;

pub const SELECT_DEVICES_WITH_LATEST_FOR_USER: &str = r#"
SELECT d.id, d.name, d.icon, d.device_type, d.is_primary, p.id, p.name,
       lp.latitude, lp.longitude, lp.readable_datetime, lp.timestamp,
       lp.battery_level, lp.battery_status
FROM devices d
JOIN user_device_access uda ON uda.device_id = d.id AND uda.user_id = ?1
LEFT JOIN people p ON p.id = d.person_id
LEFT JOIN positions lp ON lp.id = (
    SELECT id FROM positions
    WHERE device_id = d.id
    ORDER BY timestamp DESC, id DESC
    LIMIT 1
)
WHERE d.is_active = 1
ORDER BY d.name
"#;

pub const SELECT_DEVICE_BY_ID: &str = r#"
SELECT d.id, d.name, d.icon, d.device_type, d.is_primary, p.id, p.name,
       lp.latitude, lp.longitude, lp.readable_datetime, lp.timestamp,
       lp.battery_level, lp.battery_status
FROM devices d
LEFT JOIN people p ON p.id = d.person_id
LEFT JOIN positions lp ON lp.id = (
    SELECT id FROM positions
    WHERE device_id = d.id
    ORDER BY timestamp DESC, id DESC
    LIMIT 1
)
WHERE d.id = ?1 AND d.is_active = 1
"#;

pub const SELECT_DEVICE_GRANTS: &str = r#"
SELECT device_id
FROM user_device_access
WHERE user_id = ?1
"#;

// Position queries

pub const SELECT_POSITION_HISTORY: &str = r#"
SELECT latitude, longitude, readable_datetime, timestamp,
       horizontal_accuracy, battery_level
FROM positions
WHERE device_id = ?1
  AND latitude IS NOT NULL
  AND longitude IS NOT NULL
  AND timestamp > ?2
ORDER BY timestamp DESC, id DESC
LIMIT ?3
"#;

pub const INSERT_DEVICE: &str = r#"
INSERT INTO devices (id, name, icon, device_type)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT(id) DO NOTHING
"#;

pub const INSERT_POSITION: &str = r#"
INSERT INTO positions (
    device_id, latitude, longitude, altitude, floor_level,
    horizontal_accuracy, vertical_accuracy, position_type,
    address, city, country, timestamp, readable_datetime,
    battery_level, battery_status
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
"#;

// Seeding helpers, used by demo data and tests

pub const INSERT_PERSON: &str = r#"
INSERT INTO people (name, emoji)
VALUES (?1, ?2)
"#;

pub const ASSIGN_DEVICE_TO_PERSON: &str = r#"
UPDATE devices
SET person_id = ?2, is_primary = ?3
WHERE id = ?1
"#;

pub const INSERT_GRANT: &str = r#"
INSERT INTO user_device_access (user_id, device_id)
VALUES (?1, ?2)
ON CONFLICT(user_id, device_id) DO NOTHING
"#;
