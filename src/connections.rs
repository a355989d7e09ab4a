//! Related-card discovery by word and tag overlap.
//!
//! Two passes with different thresholds:
//! - the suggestion pass proposes cross-references for free text when at
//!   least two words are shared with a card title;
//! - the decoration pass lists cards sharing any tag or title word with a
//!   new card, for the "Related Cards" section of its document.
//!
//! Neither pass touches the cross-reference graph.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::document::hashtag;
use crate::metadata::Document;
use crate::models::{Card, CardId, CardIndex};

/// Minimum number of shared words for the suggestion pass.
pub const MIN_SHARED_WORDS: usize = 2;

const DESCRIPTION_WORDS: usize = 7;
const CONNECTION_HASHTAGS: usize = 3;

/// A card surfaced by the decoration pass, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZettelConnection {
    pub id: CardId,
    /// Up to three hashtags derived from the related card's tags.
    pub hashtags: String,
    /// First words of the related card's title and category.
    pub description: String,
}

/// Finds related cards among the entries of a card index.
pub struct ThematicConnectionFinder<'a> {
    index: &'a CardIndex,
}

impl<'a> ThematicConnectionFinder<'a> {
    pub fn new(index: &'a CardIndex) -> Self {
        Self { index }
    }

    /// Suggestion pass: candidates whose title shares at least
    /// [`MIN_SHARED_WORDS`] words with `text`.
    ///
    /// Candidates default to every indexed card; ids missing from the index
    /// are skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use zettel::{CardId, CardIndex, CardSummary, ThematicConnectionFinder};
    ///
    /// let mut index = CardIndex::new();
    /// index.insert(CardId::new("1"), CardSummary { title: "Alpha Beta notes".into(), ..Default::default() });
    /// index.insert(CardId::new("2"), CardSummary { title: "Gamma rays".into(), ..Default::default() });
    ///
    /// let finder = ThematicConnectionFinder::new(&index);
    /// assert_eq!(finder.find_thematic_connections("alpha beta gamma", None), vec![CardId::new("1")]);
    /// ```
    pub fn find_thematic_connections(
        &self,
        text: &str,
        candidates: Option<&[CardId]>,
    ) -> Vec<CardId> {
        let words = word_set(text);
        let matches = |id: &CardId| {
            self.index.get(id).is_some_and(|summary| {
                word_set(&summary.title).intersection(&words).count() >= MIN_SHARED_WORDS
            })
        };

        match candidates {
            Some(ids) => ids.iter().filter(|&id| matches(id)).cloned().collect(),
            None => self.index.ids().filter(|&id| matches(id)).cloned().collect(),
        }
    }

    /// Decoration pass: every other indexed card sharing a tag or a title word
    /// with `card`.
    pub fn find_zettel_connections(&self, card: &Card) -> Vec<ZettelConnection> {
        let own_words = title_words(&card.title);

        self.index
            .iter()
            .filter(|(id, _)| **id != card.id)
            .filter(|(_, summary)| {
                !summary.tags.is_disjoint(&card.tags)
                    || !own_words.is_disjoint(&title_words(&summary.title))
            })
            .map(|(id, summary)| ZettelConnection {
                id: id.clone(),
                hashtags: summary
                    .tags
                    .iter()
                    .take(CONNECTION_HASHTAGS)
                    .map(|tag| hashtag(tag))
                    .collect::<Vec<_>>()
                    .join(" "),
                description: format!("{} {}", summary.title, summary.category)
                    .split_whitespace()
                    .take(DESCRIPTION_WORDS)
                    .collect::<Vec<_>>()
                    .join(" "),
            })
            .collect()
    }
}

/// Case-folded words of `text`: maximal runs of alphanumerics and `_`.
pub fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .map(String::from)
        .collect()
}

/// Case-folded whitespace-separated title words, punctuation kept.
fn title_words(title: &str) -> BTreeSet<String> {
    title.to_lowercase().split_whitespace().map(String::from).collect()
}

/// Ids surfaced by the decoration pass for each card at creation time,
/// persisted as `thematic_connections.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionCache {
    connections: BTreeMap<CardId, Vec<CardId>>,
}

impl Document for ConnectionCache {
    const FILE_NAME: &'static str = "thematic_connections.json";
}

impl ConnectionCache {
    pub fn record(&mut self, id: CardId, related: Vec<CardId>) {
        self.connections.insert(id, related);
    }

    pub fn get(&self, id: &CardId) -> &[CardId] {
        self.connections.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
