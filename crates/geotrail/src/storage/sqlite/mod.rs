//! SQLite-backed position store.
//!
//! SQL lives in `schema`, row mapping in `conversions`, error mapping in
//! `error`, and the async repository itself in `repository`.

pub mod conversions;
pub mod error;
pub mod repository;
pub mod schema;

pub use repository::SqlitePositionStore;
