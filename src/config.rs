//! Filesystem layout for a card collection.
//!
//! Everything lives under one root directory:
//! - `{root}/cards` holds the card folders (`1`..`5`, `A`, `Z`, ...)
//! - `{root}/cards/_metadata` holds the JSON state documents
//! - `{root}/rules.json` is the numbering and file categorization rule source
//! - `{root}/index.db` is the SQLite search projection

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Name of the folder under the card directory that holds state documents.
pub const METADATA_DIR_NAME: &str = "_metadata";

/// Resolved paths for a card collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory containing the card folders.
    pub base_dir: PathBuf,
    /// Directory containing the numbering, graph, index and connection documents.
    pub metadata_dir: PathBuf,
    /// Location of the external rule source.
    pub rules_path: PathBuf,
    /// Location of the SQLite search projection.
    pub index_path: PathBuf,
}

impl Config {
    /// Builds the default layout rooted at `root`.
    ///
    /// # Examples
    ///
    /// ```
    /// use zettel::Config;
    ///
    /// let config = Config::with_root("/srv/zettel");
    /// assert!(config.base_dir.ends_with("cards"));
    /// assert!(config.metadata_dir.ends_with("cards/_metadata"));
    /// assert!(config.rules_path.ends_with("rules.json"));
    /// assert!(config.index_path.ends_with("index.db"));
    /// ```
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let base_dir = root.join("cards");
        Self {
            metadata_dir: base_dir.join(METADATA_DIR_NAME),
            base_dir,
            rules_path: root.join("rules.json"),
            index_path: root.join("index.db"),
        }
    }

    /// Resolves the layout from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `ZETTEL_HOME`: collection root (default `{data_dir}/zettel`)
    /// - `ZETTEL_RULES`: rule source path (default `{root}/rules.json`)
    /// - `ZETTEL_INDEX_DB`: search projection path (default `{root}/index.db`)
    ///
    /// `data_dir` is `~/.local/share` on Linux, `~/Library/Application Support`
    /// on macOS and `C:\Users\<user>\AppData\Roaming` on Windows.
    ///
    /// # Errors
    ///
    /// Returns an error if `ZETTEL_HOME` is unset and the data directory
    /// cannot be determined.
    pub fn from_env() -> Result<Self> {
        let root = match std::env::var_os("ZETTEL_HOME") {
            Some(home) => PathBuf::from(home),
            None => default_root()?,
        };

        let mut config = Self::with_root(root);
        if let Some(rules) = std::env::var_os("ZETTEL_RULES") {
            config.rules_path = PathBuf::from(rules);
        }
        if let Some(index) = std::env::var_os("ZETTEL_INDEX_DB") {
            config.index_path = PathBuf::from(index);
        }
        Ok(config)
    }

    /// Ensures the parent directory of the search projection exists.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn ensure_index_directory(&self) -> Result<()> {
        if let Some(parent) = self.index_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create index directory: {}", parent.display())
            })?;
        }
        Ok(())
    }
}

fn default_root() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Failed to determine data directory"))?;

    Ok(data_dir.join("zettel"))
}
