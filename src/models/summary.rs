use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use super::CardId;
use super::lenient::{set_or_empty, timestamp_or_none, value_or_default};
use crate::metadata::Document;

/// Index entry for a card: everything but the content body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSummary {
    #[serde(default, deserialize_with = "value_or_default")]
    pub file_path: PathBuf,
    #[serde(default, deserialize_with = "value_or_default")]
    pub title: String,
    #[serde(default, deserialize_with = "value_or_default")]
    pub category: String,
    #[serde(
        default,
        serialize_with = "time::serde::rfc3339::option::serialize",
        deserialize_with = "timestamp_or_none"
    )]
    pub created: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "set_or_empty")]
    pub tags: BTreeSet<String>,
    #[serde(default, deserialize_with = "set_or_empty")]
    pub cross_references: BTreeSet<CardId>,
}

/// Authoritative id → summary lookup table, persisted as `card_index.json`.
///
/// Entries decode one at a time: an entry that is not an object keeps its id
/// with an empty summary instead of failing the whole index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CardIndex {
    entries: BTreeMap<CardId, CardSummary>,
}

impl<'de> Deserialize<'de> for CardIndex {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<CardId, serde_json::Value>::deserialize(deserializer)?;
        let entries = raw
            .into_iter()
            .map(|(id, value)| {
                let summary = CardSummary::deserialize(value).unwrap_or_else(|e| {
                    log::warn!("Card index entry {id} is malformed: {e}; keeping an empty entry");
                    CardSummary::default()
                });
                (id, summary)
            })
            .collect();
        Ok(Self { entries })
    }
}

impl Document for CardIndex {
    const FILE_NAME: &'static str = "card_index.json";
}

impl CardIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &CardId) -> Option<&CardSummary> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &CardId) -> Option<&mut CardSummary> {
        self.entries.get_mut(id)
    }

    pub fn contains(&self, id: &CardId) -> bool {
        self.entries.contains_key(id)
    }

    /// Registers or replaces the entry for `id`.
    pub fn insert(&mut self, id: CardId, summary: CardSummary) {
        self.entries.insert(id, summary);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &CardId> {
        self.entries.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, CardId, CardSummary> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, CardId, CardSummary> {
        self.entries.iter_mut()
    }
}

impl<'a> IntoIterator for &'a CardIndex {
    type Item = (&'a CardId, &'a CardSummary);
    type IntoIter = btree_map::Iter<'a, CardId, CardSummary>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_missing_collections_decode_as_empty() {
        let json = r#"{
            "1": { "file_path": "X/main/1.md", "title": "Rivers", "category": "main",
                   "created": "2025-01-01T09:00:00.000001" },
            "2": { "file_path": "X/main/2.md", "title": "Lakes", "category": "main",
                   "tags": null, "cross_references": "oops" }
        }"#;

        let index: CardIndex = serde_json::from_str(json).unwrap();
        assert_eq!(index.len(), 2);

        for (_, summary) in &index {
            assert!(summary.tags.is_empty());
            assert!(summary.cross_references.is_empty());
        }
        assert!(index.get(&CardId::new("1")).unwrap().created.is_some());
    }

    #[test]
    fn one_bad_entry_keeps_the_rest_of_the_index() {
        let json = r#"{
            "1": { "file_path": "X/main/1.md", "title": "Rivers", "category": "main", "tags": ["water"] },
            "2": { "file_path": 7, "title": 5, "category": ["main"] },
            "3": "not an entry"
        }"#;

        let index: CardIndex = serde_json::from_str(json).unwrap();

        assert_eq!(index.len(), 3);
        let rivers = index.get(&CardId::new("1")).unwrap();
        assert_eq!(rivers.title, "Rivers");
        assert!(rivers.tags.contains("water"));
        let lakes = index.get(&CardId::new("2")).unwrap();
        assert!(lakes.title.is_empty());
        assert!(lakes.category.is_empty());
        assert_eq!(index.get(&CardId::new("3")), Some(&CardSummary::default()));
    }

    #[test]
    fn index_serializes_as_plain_map() {
        let mut index = CardIndex::new();
        index.insert(
            CardId::new("1"),
            CardSummary {
                title: "Rivers".to_string(),
                ..Default::default()
            },
        );

        let value = serde_json::to_value(&index).unwrap();
        assert_eq!(value["1"]["title"], "Rivers");
        assert_eq!(value["1"]["tags"], serde_json::json!([]));
        assert!(value["1"]["created"].is_null());
    }
}
