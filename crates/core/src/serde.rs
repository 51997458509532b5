//! Serde helper functions for ingest payload deserialization.
//!
//! Device vendors are sloppy about optional fields: absent keys, empty
//! strings, and whitespace all mean "unknown" and should land as None.

use serde::{Deserialize, Deserializer};

/// Deserialize an optional string, treating empty strings as None.
pub fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.trim().is_empty()))
}
