//! Wire-format payloads.

pub mod report;

pub use report::{ReportBatch, ReportItem};
