use thiserror::Error;

use geotrail_core::store::StoreError;

/// Errors from principal-scoped device operations.
///
/// Denied and NotFound are deliberately distinct variants: a principal
/// must never learn whether a device it cannot access exists, and the
/// handler layer maps them to 403 and 404 respectively. NotFound is
/// only ever produced after the access check passed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceAccessError {
    #[error("Access denied to device: {0}")]
    Denied(String),
    #[error("Device not found: {0}")]
    NotFound(String),
    #[error("Invalid time window: {0}")]
    InvalidWindow(String),
    #[error("Staff privileges required")]
    StaffRequired,
    #[error(transparent)]
    Store(#[from] StoreError),
}
