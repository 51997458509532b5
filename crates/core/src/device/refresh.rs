use serde::Serialize;

/// Result of one cache materialization run.
///
/// Refresh never raises: store errors are folded into a failed outcome
/// so callers can decide between serving the previous snapshot and
/// falling back to live queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshOutcome {
    pub success: bool,
    pub duration_ms: u64,
    pub rows_affected: usize,
    /// Present only on failure.
    pub error_message: Option<String>,
}

impl RefreshOutcome {
    pub fn ok(duration_ms: u64, rows_affected: usize) -> Self {
        Self {
            success: true,
            duration_ms,
            rows_affected,
            error_message: None,
        }
    }

    pub fn failed(duration_ms: u64, error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            duration_ms,
            rows_affected: 0,
            error_message: Some(error_message.into()),
        }
    }
}
