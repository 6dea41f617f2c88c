//! Key/value byte blob stores.
//!
//! Each blob is replaced whole. [`FileBlobStore`] writes a temporary file,
//! syncs it and renames it over the old one, so readers never see a half
//! written record.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

/// Opaque blob persistence.
pub trait BlobStore: Send + Sync {
    /// Read a blob. `Ok(None)` if it was never written.
    fn load(&self, key: &str) -> io::Result<Option<Vec<u8>>>;

    /// Replace a blob atomically.
    fn store(&self, key: &str, bytes: &[u8]) -> io::Result<()>;
}

// =============================================================================
// File Store
// =============================================================================

/// Blobs stored as files in one directory.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`.
    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl BlobStore for FileBlobStore {
    fn load(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path(key)) {
            Ok(bytes) => {
                debug!("Read {} bytes from {}", bytes.len(), key);
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn store(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let target = self.path(key);
        let staging = self.dir.join(format!("{}.tmp", key));
        {
            let mut file = File::create(&staging)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&staging, &target)?;

        debug!("Wrote {} bytes to {}", bytes.len(), target.display());
        Ok(())
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-process store. Clones share the same blobs.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl BlobStore for MemoryBlobStore {
    fn load(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.blobs.lock().get(key).cloned())
    }

    fn store(&self, key: &str, bytes: &[u8]) -> io::Result<()> {
        self.blobs.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}
