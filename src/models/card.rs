use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{CardId, CardSummary};

/// A knowledge card with its full content.
///
/// Cards are append-only: once written they are never updated in place
/// or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: BTreeSet<String>,
    pub cross_references: BTreeSet<CardId>,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub modified: OffsetDateTime,
    /// Location of the rendered card document.
    pub file_path: PathBuf,
}

impl Card {
    /// Projects the card onto its index entry.
    pub fn summary(&self) -> CardSummary {
        CardSummary {
            file_path: self.file_path.clone(),
            title: self.title.clone(),
            category: self.category.clone(),
            created: Some(self.created),
            tags: self.tags.clone(),
            cross_references: self.cross_references.clone(),
        }
    }
}

/// Builder for constructing `Card` instances with optional fields.
///
/// # Examples
///
/// ```
/// use zettel::{CardBuilder, CardId};
///
/// let card = CardBuilder::new(CardId::new("1"), "Rivers")
///     .content("Notes on rivers")
///     .category("main")
///     .tags(["geography"])
///     .build();
///
/// assert_eq!(card.id, CardId::new("1"));
/// assert_eq!(card.title, "Rivers");
/// assert!(card.cross_references.is_empty());
/// ```
#[derive(Debug)]
pub struct CardBuilder {
    id: CardId,
    title: String,
    content: String,
    category: String,
    tags: BTreeSet<String>,
    cross_references: BTreeSet<CardId>,
    created: Option<OffsetDateTime>,
    file_path: PathBuf,
}

impl CardBuilder {
    /// Starts a card with its two required fields.
    pub fn new(id: CardId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            content: String::new(),
            category: String::new(),
            tags: BTreeSet::new(),
            cross_references: BTreeSet::new(),
            created: None,
            file_path: PathBuf::new(),
        }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn cross_references<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = CardId>,
    {
        self.cross_references = ids.into_iter().collect();
        self
    }

    /// Sets both the created and modified timestamps.
    pub fn created(mut self, created: OffsetDateTime) -> Self {
        self.created = Some(created);
        self
    }

    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = path.into();
        self
    }

    /// Builds the card, stamping it with the current time if no timestamp was set.
    pub fn build(self) -> Card {
        let created = self.created.unwrap_or_else(OffsetDateTime::now_utc);
        Card {
            id: self.id,
            title: self.title,
            content: self.content,
            category: self.category,
            tags: self.tags,
            cross_references: self.cross_references,
            created,
            modified: created,
            file_path: self.file_path,
        }
    }
}
