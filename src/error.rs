use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::CardId;

/// Errors surfaced by card store and search index operations.
///
/// Configuration problems never show up here: they are logged and replaced
/// by built-in defaults. Decode problems in stored documents degrade to empty
/// values instead of failing the operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing a file on disk failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A state document could not be encoded.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The search projection database rejected a statement.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A timestamp could not be rendered into a card document.
    #[error("Timestamp format error: {0}")]
    Format(#[from] time::error::Format),

    /// No numbering rule could produce an id for the category.
    #[error("No numbering rule matches category '{0}'")]
    UnknownCategory(String),

    /// The allocated id already belongs to an existing card.
    #[error("Card {0} already exists; refusing to overwrite it")]
    IdCollision(CardId),
}

impl StoreError {
    /// Wraps an I/O error together with the path that caused it.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
