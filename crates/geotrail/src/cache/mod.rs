//! The device cache: a denormalized, periodically refreshed snapshot of
//! every active device with its latest position.
//!
//! The artifact holds one complete snapshot at a time and is replaced
//! wholesale on each refresh, so readers never observe a partially
//! updated cache. The materializer owns the only write path; everything
//! else reads.

mod artifact;
mod materializer;
mod stats;

pub use artifact::CacheArtifact;
pub use materializer::CacheMaterializer;
pub use stats::{RefreshErrorEntry, RefreshStats, RefreshStatsReport};
