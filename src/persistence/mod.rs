//! Persistence Module
//!
//! Best-effort durability for the cache store. The engine writes a full
//! snapshot to a [`PersistenceBackend`] after every mutation and reloads it on
//! construction; failures are logged by the engine and never surface to
//! callers.
//!
//! # Snapshot layout
//! A JSON array of `{key, value, timestamp, ttl, etag?, lastModified?, metadata?}`
//! with `timestamp` in Unix milliseconds and `ttl` in milliseconds.

mod file;
mod memory;

use std::fmt::Debug;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheEntry, Validators};
use crate::error::PersistenceError;

pub use file::FileBackend;
pub use memory::MemoryBackend;

/// A single durable slot holding the serialized snapshot.
pub trait PersistenceBackend: Send + Sync + Debug {
    /// Returns the stored snapshot, or None if the slot is empty.
    fn load(&self) -> Result<Option<Vec<u8>>, PersistenceError>;

    /// Replaces the stored snapshot.
    fn save(&self, bytes: &[u8]) -> Result<(), PersistenceError>;
}

// == Persisted Entry ==
/// On-disk form of one cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedEntry<V> {
    pub key: String,
    pub value: V,
    pub timestamp: u64,
    pub ttl: u64,
    #[serde(flatten)]
    pub validators: Validators,
}

impl<V> PersistedEntry<V> {
    /// Converts the record back into a cache entry.
    pub fn into_entry(self) -> CacheEntry<V> {
        CacheEntry::new(
            self.key,
            self.value,
            self.timestamp,
            Duration::from_millis(self.ttl),
            self.validators,
        )
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.timestamp) > self.ttl
    }
}

// == Encode ==
/// Serializes entries into the snapshot format.
pub fn encode_snapshot<'a, V, I>(entries: I) -> Result<Vec<u8>, PersistenceError>
where
    V: Serialize + 'a,
    I: IntoIterator<Item = &'a CacheEntry<V>>,
{
    let records: Vec<PersistedEntry<&V>> = entries
        .into_iter()
        .map(|entry| PersistedEntry {
            key: entry.key.clone(),
            value: &entry.value,
            timestamp: entry.inserted_at,
            ttl: entry.ttl_ms(),
            validators: entry.validators.clone(),
        })
        .collect();

    Ok(serde_json::to_vec(&records)?)
}

// == Decode ==
/// Parses a snapshot produced by [`encode_snapshot`].
pub fn decode_snapshot<V: DeserializeOwned>(
    bytes: &[u8],
) -> Result<Vec<PersistedEntry<V>>, PersistenceError> {
    Ok(serde_json::from_slice(bytes)?)
}
