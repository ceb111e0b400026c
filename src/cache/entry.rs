//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// == Validators ==
/// Opaque metadata carried alongside a value for the caller's use.
///
/// The engine stores and persists it but never interprets it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validators {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Normalized key
    pub key: String,
    /// Last successfully fetched or written value
    pub value: V,
    /// Write timestamp (Unix milliseconds)
    pub inserted_at: u64,
    /// Lifetime measured from `inserted_at`
    pub ttl: Duration,
    /// Caller metadata
    pub validators: Validators,
    /// Store-assigned write sequence, breaks `inserted_at` ties
    pub(crate) seq: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry written at `now_ms`.
    pub fn new(key: String, value: V, now_ms: u64, ttl: Duration, validators: Validators) -> Self {
        Self {
            key,
            value,
            inserted_at: now_ms,
            ttl,
            validators,
            seq: 0,
        }
    }

    /// Milliseconds elapsed since the entry was written.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.inserted_at)
    }

    /// TTL in milliseconds, saturating at `u64::MAX`.
    pub fn ttl_ms(&self) -> u64 {
        u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX)
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once its age is strictly greater than its TTL; at
    /// exactly `inserted_at + ttl` it is still live.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.age_ms(now_ms) > self.ttl_ms()
    }

    /// Checks whether the entry has aged past `threshold` of its TTL.
    pub fn past_refresh_threshold(&self, now_ms: u64, threshold: f64) -> bool {
        self.age_ms(now_ms) as f64 > self.ttl_ms() as f64 * threshold
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.ttl_ms().saturating_sub(self.age_ms(now_ms))
    }
}
