//! Device domain types.
//!
//! Covers the denormalized device snapshot served from the cache, raw
//! route points, the requesting principal, access scoping, cache
//! freshness evaluation, and refresh outcomes.

mod freshness;
mod refresh;
mod scope;
mod types;

pub use freshness::{FreshnessPolicy, FreshnessReport};
pub use refresh::RefreshOutcome;
pub use scope::AccessScope;
pub use types::{decimal_string, DeviceSnapshot, Principal, RoutePoint};
