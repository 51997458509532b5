use thiserror::Error;

/// Errors that can occur during position store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Query timed out after {0} ms")]
    Timeout(u64),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type for position store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let error = StoreError::NotFound {
            entity_type: "Device",
            id: "dev-42".to_string(),
        };
        assert_eq!(error.to_string(), "Device not found: dev-42");
    }

    #[test]
    fn test_connection_failed_display() {
        let error = StoreError::ConnectionFailed("refused".to_string());
        assert_eq!(error.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_query_failed_display() {
        let error = StoreError::QueryFailed("no such table: devices".to_string());
        assert_eq!(error.to_string(), "Query failed: no such table: devices");
    }

    #[test]
    fn test_timeout_display() {
        let error = StoreError::Timeout(8000);
        assert_eq!(error.to_string(), "Query timed out after 8000 ms");
    }

    #[test]
    fn test_invalid_data_display() {
        let error = StoreError::InvalidData("battery level out of range".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid data: battery level out of range"
        );
    }
}
