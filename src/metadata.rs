//! Whole-document persistence for the JSON state files.
//!
//! Each state object is loaded once at startup and rewritten in full after
//! every mutation. A missing document yields the type's default; a document
//! that fails to decode is logged and also replaced by the default.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use crate::error::{Result, StoreError};

/// A state object stored as one JSON document in the metadata directory.
pub trait Document: Serialize + DeserializeOwned + Default {
    /// File name inside the metadata directory.
    const FILE_NAME: &'static str;
}

/// Handle to the directory holding the state documents.
#[derive(Debug, Clone)]
pub struct MetadataDir {
    path: PathBuf,
}

impl MetadataDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the directory if needed.
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.path).map_err(|e| StoreError::io(&self.path, e))
    }

    /// Full path of a document's file.
    pub fn file_path<T: Document>(&self) -> PathBuf {
        self.path.join(T::FILE_NAME)
    }

    /// Returns true if the document has been written before.
    pub fn exists<T: Document>(&self) -> bool {
        self.file_path::<T>().is_file()
    }

    /// Loads a document, falling back to its default when absent or unreadable.
    pub fn load<T: Document>(&self) -> T {
        let path = self.file_path::<T>();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
            Err(e) => {
                log::warn!("Could not read {}: {e}; starting empty", path.display());
                return T::default();
            }
        };

        serde_json::from_str(&text).unwrap_or_else(|e| {
            log::warn!("Could not decode {}: {e}; starting empty", path.display());
            T::default()
        })
    }

    /// Rewrites a document in full.
    ///
    /// The new content goes to a temporary file in the same directory which
    /// then replaces the old document, so readers never see a half-written file.
    pub fn save<T: Document>(&self, document: &T) -> Result<()> {
        let path = self.file_path::<T>();
        let json = serde_json::to_string_pretty(document)?;

        let mut tmp = NamedTempFile::new_in(&self.path).map_err(|e| StoreError::io(&path, e))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| StoreError::io(&path, e))?;
        tmp.persist(&path)
            .map_err(|e| StoreError::io(&path, e.error))?;

        log::debug!("Saved {}", path.display());
        Ok(())
    }
}
