//! File-backed persistence slot.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::PersistenceBackend;
use crate::error::PersistenceError;

/// Stores the snapshot as `<dir>/<persistence_key>.json`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous snapshot intact. I/O is synchronous;
/// the engine calls it through `block_in_place` on multi-threaded runtimes.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl AsRef<Path>, persistence_key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", persistence_key)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl PersistenceBackend for FileBackend {
    fn load(&self) -> Result<Option<Vec<u8>>, PersistenceError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, bytes: &[u8]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp = self.temp_path();
        fs::write(&temp, bytes)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_none() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path(), "app_request_cache");
        assert!(backend.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path().join("nested"), "slot");

        backend.save(b"[]").unwrap();
        assert_eq!(backend.load().unwrap().unwrap(), b"[]");
        assert!(backend.path().ends_with("nested/slot.json"));
        assert!(!backend.temp_path().exists());

        backend.save(b"[1]").unwrap();
        assert_eq!(backend.load().unwrap().unwrap(), b"[1]");
    }
}
