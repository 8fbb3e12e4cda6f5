//! Stored entry envelope
//!
//! Every value in the backing store is a single JSON document carrying the
//! payload together with the metadata needed to decode and validate it.

use serde::{Deserialize, Serialize};

/// Metadata written alongside every payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Payload is base64 of a gzip stream; decode is driven solely by this flag
    pub compressed: bool,
    /// Local version counter value at write time
    pub version: u64,
    /// Unix epoch milliseconds at write time
    pub timestamp: u64,
}

/// Envelope stored under one cache key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: String,
    pub metadata: EntryMetadata,
}

impl CacheEntry {
    pub fn new(payload: String, compressed: bool, version: u64) -> Self {
        Self {
            payload,
            metadata: EntryMetadata {
                compressed,
                version,
                timestamp: chrono::Utc::now().timestamp_millis().max(0) as u64,
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_wire_shape() {
        let entry = CacheEntry {
            payload: r#"{"a":1}"#.to_string(),
            metadata: EntryMetadata {
                compressed: false,
                version: 3,
                timestamp: 1_700_000_000_000,
            },
        };

        let value: serde_json::Value = serde_json::from_str(&entry.to_json().unwrap()).unwrap();
        assert_eq!(value["payload"], r#"{"a":1}"#);
        assert_eq!(value["metadata"]["compressed"], false);
        assert_eq!(value["metadata"]["version"], 3);
        assert_eq!(value["metadata"]["timestamp"], 1_700_000_000_000u64);
    }

    #[test]
    fn test_entry_without_metadata_is_rejected() {
        assert!(CacheEntry::from_json(r#"{"payload":"x"}"#).is_err());
        assert!(CacheEntry::from_json("not json").is_err());
    }

    #[test]
    fn test_new_stamps_current_time() {
        let before = chrono::Utc::now().timestamp_millis() as u64;
        let entry = CacheEntry::new("x".to_string(), true, 1);
        assert!(entry.metadata.timestamp >= before);
        assert!(entry.metadata.compressed);
        assert_eq!(entry.metadata.version, 1);
    }
}
