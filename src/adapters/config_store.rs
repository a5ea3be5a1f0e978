//! Configuration store adapters.
//!
//! Both implement [`ConfigPort`].  The store only moves text; the
//! controller validates what it loads.
//!
//! - [`MemoryConfigStore`]: in-process backend for tests and simulation.
//! - [`FileConfigStore`]: one JSON file on a filesystem.  Writes go to a
//!   sibling temp file first and are renamed into place, so a power cut
//!   leaves either the old or the new document.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::app::ports::ConfigPort;
use crate::error::StorageError;

// ───────────────────────────────────────────────────────────────
// In-memory backend
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    document: Option<String>,
    saves: usize,
    fail_writes: bool,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        info!("MemoryConfigStore: simulation backend");
        Self::default()
    }

    /// Start with `document` already stored.
    pub fn with_document(document: &str) -> Self {
        Self {
            document: Some(document.to_owned()),
            ..Self::default()
        }
    }

    /// The stored text, if any.
    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    /// Successful saves so far.
    pub fn saves(&self) -> usize {
        self.saves
    }

    /// Make every following save fail with an I/O error.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Forget the stored document.
    pub fn erase(&mut self) {
        self.document = None;
    }
}

impl ConfigPort for MemoryConfigStore {
    fn load(&self) -> Result<String, StorageError> {
        self.document.clone().ok_or(StorageError::NotFound)
    }

    fn save(&mut self, document: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        self.document = Some(document.to_owned());
        self.saves += 1;
        debug!("MemoryConfigStore: {} bytes stored", document.len());
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// File backend
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(ToOwned::to_owned).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ConfigPort for FileConfigStore {
    fn load(&self) -> Result<String, StorageError> {
        fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound,
            _ => {
                warn!("Config read {} failed: {e}", self.path.display());
                StorageError::IoError
            }
        })
    }

    fn save(&mut self, document: &str) -> Result<(), StorageError> {
        let temp = self.temp_path();
        fs::write(&temp, document)
            .and_then(|()| fs::rename(&temp, &self.path))
            .map_err(|e| {
                warn!("Config write {} failed: {e}", self.path.display());
                StorageError::IoError
            })?;
        debug!("Config written to {}", self.path.display());
        Ok(())
    }
}
