//! Position store backends.
//!
//! Concrete implementations of `geotrail_core::store::PositionStore`.
//! SQLite is the only backend; the in-memory variant of the same
//! implementation backs tests and demo runs.

pub mod sqlite;

pub use sqlite::SqlitePositionStore;
