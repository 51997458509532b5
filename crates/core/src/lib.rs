//! Core domain types and contracts for the geotrail project.
//!
//! This crate is storage-agnostic: it defines the device/position domain
//! model, the `PositionStore` trait that backends implement, the access
//! scoping rules, and the cache freshness policy. The binary crate wires
//! concrete backends and the HTTP surface on top of these contracts.

pub mod device;
pub mod serde;
pub mod store;
