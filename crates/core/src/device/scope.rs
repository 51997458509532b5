use std::collections::HashSet;

use super::DeviceSnapshot;

/// Per-principal visibility over device rows.
///
/// Built once per request from the principal's access grants (or the
/// staff flag) and applied uniformly to cache-sourced reads; live
/// queries scope in-store instead. The filter is pure: input rows are
/// never mutated and output preserves input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    /// Elevated principal: all rows visible, bounded by a row cap.
    Unrestricted { row_cap: usize },
    /// Regular principal: only rows whose device id appears in the
    /// grant set are visible.
    Granted(HashSet<String>),
}

impl AccessScope {
    /// True when the principal may read the given device.
    pub fn allows(&self, device_id: &str) -> bool {
        match self {
            Self::Unrestricted { .. } => true,
            Self::Granted(grants) => grants.contains(device_id),
        }
    }

    /// Filters rows down to the visible set, preserving order.
    pub fn apply(&self, rows: &[DeviceSnapshot]) -> Vec<DeviceSnapshot> {
        match self {
            Self::Unrestricted { row_cap } => rows.iter().take(*row_cap).cloned().collect(),
            Self::Granted(grants) => rows
                .iter()
                .filter(|row| grants.contains(&row.device_id))
                .cloned()
                .collect(),
        }
    }
}
