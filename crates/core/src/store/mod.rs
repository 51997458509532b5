//! Position store contract.
//!
//! The position store is the durable source of truth for raw device
//! positions and device/person metadata. This module defines the trait
//! backends implement and the error taxonomy they report through; the
//! concrete SQLite backend lives in the binary crate.

mod error;
mod traits;
mod types;

pub use error::{Result, StoreError};
pub use traits::PositionStore;
pub use types::{NewDevice, NewPosition};
