//! Filesystem cache backend
//!
//! Each key maps to `<dir>/<blake3(key)>.json`. Writes go through a temporary
//! file and a rename, so readers never see a partial policy.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{CacheBackend, CacheError};
use crate::policy::CompiledPolicy;

/// Persists compiled policies as JSON files
#[derive(Debug, Clone)]
pub struct FilesystemCache {
    directory: PathBuf,
}

impl FilesystemCache {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = blake3::hash(key.as_bytes());
        self.directory.join(format!("{}.json", digest.to_hex()))
    }
}

impl CacheBackend for FilesystemCache {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn get_item(&self, key: &str) -> Result<Option<Arc<CompiledPolicy>>, CacheError> {
        let bytes = match fs::read(self.path_for(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let policy: CompiledPolicy = serde_json::from_slice(&bytes)?;
        Ok(Some(Arc::new(policy)))
    }

    fn set_item(&self, key: &str, policy: &Arc<CompiledPolicy>) -> Result<(), CacheError> {
        if !policy.rules().is_serializable() {
            return Err(CacheError::Backend(
                "policy holds callback assertions and cannot be persisted".to_string(),
            ));
        }

        let bytes = serde_json::to_vec(policy.as_ref())?;
        fs::create_dir_all(&self.directory)?;

        // Each writer gets its own temporary file; the rename is atomic
        let mut tmp = tempfile::NamedTempFile::new_in(&self.directory)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(key)).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<bool, CacheError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
