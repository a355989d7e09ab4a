use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::rules::Counter;
use crate::metadata::Document;
use crate::models::CardId;
use crate::models::lenient::value_or_default;

/// Persisted numbering state: counters, bucket membership and subtopic children.
///
/// Stored as `numbering_scheme.json` and rewritten after every allocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingScheme {
    #[serde(default, deserialize_with = "value_or_default")]
    pub main_topics: Vec<CardId>,
    /// Allocated subtopic ids keyed by parent id.
    #[serde(default, deserialize_with = "value_or_default")]
    pub subtopics: BTreeMap<String, Vec<CardId>>,
    #[serde(default, deserialize_with = "value_or_default")]
    pub frequently_accessed: Vec<CardId>,
    #[serde(default, deserialize_with = "value_or_default")]
    pub quotes_excerpts: Vec<CardId>,
    #[serde(default, deserialize_with = "value_or_default")]
    pub last_main_topic: u64,
    #[serde(default, deserialize_with = "value_or_default")]
    pub last_frequent: u64,
    #[serde(default, deserialize_with = "value_or_default")]
    pub last_quote: u64,
}

impl Document for NumberingScheme {
    const FILE_NAME: &'static str = "numbering_scheme.json";
}

impl NumberingScheme {
    pub fn counter(&self, counter: Counter) -> u64 {
        match counter {
            Counter::MainTopic => self.last_main_topic,
            Counter::Frequent => self.last_frequent,
            Counter::Quote => self.last_quote,
        }
    }

    fn counter_mut(&mut self, counter: Counter) -> &mut u64 {
        match counter {
            Counter::MainTopic => &mut self.last_main_topic,
            Counter::Frequent => &mut self.last_frequent,
            Counter::Quote => &mut self.last_quote,
        }
    }

    pub fn members(&self, counter: Counter) -> &[CardId] {
        match counter {
            Counter::MainTopic => &self.main_topics,
            Counter::Frequent => &self.frequently_accessed,
            Counter::Quote => &self.quotes_excerpts,
        }
    }

    fn members_mut(&mut self, counter: Counter) -> &mut Vec<CardId> {
        match counter {
            Counter::MainTopic => &mut self.main_topics,
            Counter::Frequent => &mut self.frequently_accessed,
            Counter::Quote => &mut self.quotes_excerpts,
        }
    }

    /// Bumps `counter` and returns `prefix + value`.
    ///
    /// When `bucket` is set the id is also recorded in that bucket's
    /// membership list. Only the `main`, `frequent` and `quote` categories
    /// have one; other categories sharing a counter are not tracked.
    pub fn next_in_bucket(
        &mut self,
        prefix: &str,
        counter: Counter,
        bucket: Option<Counter>,
    ) -> CardId {
        let value = self.counter_mut(counter);
        *value += 1;
        let id = CardId::new(format!("{prefix}{value}"));
        if let Some(bucket) = bucket {
            self.members_mut(bucket).push(id.clone());
        }
        id
    }

    /// Allocates `parent + next letter` and records it under `parent`.
    pub fn next_subtopic(&mut self, parent: &str) -> CardId {
        let children = self.subtopics.entry(parent.to_string()).or_default();
        let id = CardId::new(format!("{parent}{}", next_subtopic_letter(children)));
        children.push(id.clone());
        id
    }

    /// Total number of subtopic ids across all parents.
    pub fn subtopic_count(&self) -> usize {
        self.subtopics.values().map(Vec::len).sum()
    }

    /// Raises each counter to at least the highest number already handed out
    /// in its bucket, so a stale counter can never reissue an id.
    pub fn reconcile_counters(&mut self) {
        for counter in [Counter::MainTopic, Counter::Frequent, Counter::Quote] {
            let highest = self
                .members(counter)
                .iter()
                .filter_map(CardId::numeric_suffix)
                .max()
                .unwrap_or(0);
            self.raise_counter(counter, highest);
        }
    }

    /// Raises `counter` to `highest` if it is below it.
    ///
    /// Returns true when the counter changed.
    pub fn raise_counter(&mut self, counter: Counter, highest: u64) -> bool {
        let value = self.counter_mut(counter);
        if *value >= highest {
            return false;
        }
        log::warn!(
            "Counter {} was {} but ids up to {highest} exist; raising it",
            counter.field(),
            *value
        );
        *value = highest;
        true
    }
}

/// Picks the first letter `a..z` not yet used as the final character of an
/// existing child; when all 26 are taken the fixed continuation `aa` is used.
///
/// # Examples
///
/// ```
/// use zettel::CardId;
/// use zettel::numbering::next_subtopic_letter;
///
/// let children = [CardId::new("3a"), CardId::new("3b")];
/// assert_eq!(next_subtopic_letter(&children), "c");
/// assert_eq!(next_subtopic_letter(&[]), "a");
/// ```
pub fn next_subtopic_letter(children: &[CardId]) -> String {
    let used: Vec<char> = children
        .iter()
        .filter_map(|id| id.as_str().chars().last())
        .filter(char::is_ascii_alphabetic)
        .collect();

    ('a'..='z')
        .find(|letter| !used.contains(letter))
        .map_or_else(|| "aa".to_string(), String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<CardId> {
        raw.iter().map(|id| CardId::new(*id)).collect()
    }

    #[test]
    fn next_letter_skips_used_letters() {
        assert_eq!(next_subtopic_letter(&ids(&["3a", "3b"])), "c");
        assert_eq!(next_subtopic_letter(&ids(&["3b"])), "a");
    }

    #[test]
    fn exhausted_letters_fall_back_to_aa() {
        let children: Vec<CardId> = ('a'..='z').map(|c| CardId::new(format!("3{c}"))).collect();
        assert_eq!(next_subtopic_letter(&children), "aa");

        // The continuation does not escalate further.
        let mut more = children.clone();
        more.push(CardId::new("3aa"));
        assert_eq!(next_subtopic_letter(&more), "aa");
    }

    #[test]
    fn bucket_allocation_tracks_membership() {
        let mut scheme = NumberingScheme::default();

        let bucket = Some(Counter::Frequent);
        assert_eq!(scheme.next_in_bucket("A", Counter::Frequent, bucket), CardId::new("A1"));
        assert_eq!(scheme.next_in_bucket("A", Counter::Frequent, bucket), CardId::new("A2"));
        assert_eq!(scheme.last_frequent, 2);
        assert_eq!(scheme.frequently_accessed, ids(&["A1", "A2"]));
        assert!(scheme.main_topics.is_empty());
    }

    #[test]
    fn untracked_allocation_only_bumps_counter() {
        let mut scheme = NumberingScheme::default();

        assert_eq!(scheme.next_in_bucket("P", Counter::MainTopic, None), CardId::new("P1"));
        assert_eq!(scheme.last_main_topic, 1);
        assert!(scheme.main_topics.is_empty());
    }

    #[test]
    fn subtopic_allocation_records_children_per_parent() {
        let mut scheme = NumberingScheme::default();

        assert_eq!(scheme.next_subtopic("1"), CardId::new("1a"));
        assert_eq!(scheme.next_subtopic("1"), CardId::new("1b"));
        assert_eq!(scheme.next_subtopic("2"), CardId::new("2a"));
        assert_eq!(scheme.subtopic_count(), 3);
    }

    #[test]
    fn reconcile_raises_stale_counters() {
        let mut scheme = NumberingScheme {
            main_topics: ids(&["1", "2", "7"]),
            quotes_excerpts: ids(&["Z4"]),
            last_main_topic: 3,
            last_quote: 9,
            ..Default::default()
        };

        scheme.reconcile_counters();

        assert_eq!(scheme.last_main_topic, 7);
        assert_eq!(scheme.last_quote, 9);
        assert_eq!(scheme.last_frequent, 0);
    }

    #[test]
    fn decodes_legacy_document_shape() {
        let json = r#"{
            "main_topics": ["1", "2"],
            "subtopics": { "1": ["1a"] },
            "frequently_accessed": [],
            "quotes_excerpts": ["Z1"],
            "last_main_topic": 2,
            "last_frequent": 0,
            "last_quote": 1
        }"#;

        let scheme: NumberingScheme = serde_json::from_str(json).unwrap();
        assert_eq!(scheme.last_main_topic, 2);
        assert_eq!(scheme.subtopics["1"], ids(&["1a"]));
        assert_eq!(scheme.subtopic_count(), 1);
    }

    #[test]
    fn mistyped_fields_keep_the_rest_of_the_scheme() {
        let json = r#"{
            "main_topics": ["1", "2"],
            "subtopics": "broken",
            "quotes_excerpts": ["Z1"],
            "last_main_topic": 2,
            "last_quote": "0"
        }"#;

        let mut scheme: NumberingScheme = serde_json::from_str(json).unwrap();
        assert_eq!(scheme.last_main_topic, 2);
        assert_eq!(scheme.last_quote, 0);
        assert!(scheme.subtopics.is_empty());

        scheme.reconcile_counters();
        assert_eq!(scheme.last_quote, 1);
    }
}
