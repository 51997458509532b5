//! Query-facing services composed over the cache and the position store.

mod devices;
mod error;

pub use devices::{DeviceListing, DeviceQueryService, ListingSource};
pub use error::DeviceAccessError;
