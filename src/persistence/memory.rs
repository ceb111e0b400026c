//! In-memory persistence slot, used for tests and for restarts within one
//! process.

use std::sync::Mutex;

use super::PersistenceBackend;
use crate::error::PersistenceError;

/// Holds the snapshot bytes in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slot: Mutex<Option<Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot that already holds `bytes`.
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            slot: Mutex::new(Some(bytes.into())),
        }
    }

    /// Returns a copy of the stored snapshot.
    pub fn bytes(&self) -> Option<Vec<u8>> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl PersistenceBackend for MemoryBackend {
    fn load(&self) -> Result<Option<Vec<u8>>, PersistenceError> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| PersistenceError::Unavailable("memory slot poisoned".to_string()))?;
        Ok(slot.clone())
    }

    fn save(&self, bytes: &[u8]) -> Result<(), PersistenceError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| PersistenceError::Unavailable("memory slot poisoned".to_string()))?;
        *slot = Some(bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_slot_loads_none() {
        let backend = MemoryBackend::new();
        assert!(backend.load().unwrap().is_none());
    }

    #[test]
    fn test_save_replaces_slot() {
        let backend = MemoryBackend::with_bytes(b"old".to_vec());
        backend.save(b"new").unwrap();
        assert_eq!(backend.load().unwrap().unwrap(), b"new");
        assert_eq!(backend.bytes().unwrap(), b"new");
    }
}
