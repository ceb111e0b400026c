//! Request DTOs for the cache admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::time::Duration;

use serde::Deserialize;

use crate::cache::{RequestOptions, WarmUpEntry};

/// Longest key accepted over the admin API
pub const MAX_KEY_LENGTH: usize = 2048;

/// Request body for writing an entry (PUT /entries, and each item of POST /warmup)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON value
/// - `ttl_ms`: Optional TTL in milliseconds (uses default if not specified)
/// - `etag`, `last_modified`, `metadata`: Optional validators kept with the entry
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} characters",
                MAX_KEY_LENGTH
            ));
        }
        if self.ttl_ms == Some(0) {
            return Some("ttl_ms must be greater than zero".to_string());
        }
        None
    }

    /// Builds the write options carried by this request.
    pub fn options(&self) -> RequestOptions {
        let mut options = RequestOptions::new();
        options.ttl = self.ttl_ms.map(Duration::from_millis);
        options.validators.etag = self.etag.clone();
        options.validators.last_modified = self.last_modified.clone();
        options.validators.metadata = self.metadata.clone();
        options
    }

    pub fn into_warm_up_entry(self) -> WarmUpEntry<serde_json::Value> {
        let options = self.options();
        WarmUpEntry::new(self.key, self.value).with_options(options)
    }
}

/// Request body for POST /invalidate
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    /// Regular expression matched against normalized keys
    pub pattern: String,
}
