use std::path::{Path, PathBuf};

use super::rules::{Counter, NumberingRule, NumberingRules};
use super::scheme::NumberingScheme;
use crate::error::Result;
use crate::metadata::MetadataDir;
use crate::models::{CardId, Category};

/// Issues card ids according to the numbering rules.
///
/// Owns the numbering scheme and the rules resolved from the rule source.
/// Every allocation through [`allocate`](Self::allocate) is written through
/// to the metadata directory before the id is returned.
#[derive(Debug)]
pub struct NumberingAllocator {
    rules_path: PathBuf,
    rules: NumberingRules,
    scheme: NumberingScheme,
}

impl NumberingAllocator {
    /// Creates an allocator over an existing scheme.
    pub fn new(rules: NumberingRules, scheme: NumberingScheme) -> Self {
        Self {
            rules_path: PathBuf::new(),
            rules,
            scheme,
        }
    }

    /// Loads rules from `rules_path` and the scheme from `metadata`.
    ///
    /// A scheme that has never been written bootstraps to empty counters and
    /// is persisted immediately.
    pub fn load(metadata: &MetadataDir, rules_path: &Path) -> Result<Self> {
        let rules = NumberingRules::load(rules_path);

        let bootstrap = !metadata.exists::<NumberingScheme>();
        let mut scheme: NumberingScheme = metadata.load();
        scheme.reconcile_counters();
        if bootstrap {
            log::info!("Initializing numbering scheme in {}", metadata.path().display());
            metadata.save(&scheme)?;
        }

        Ok(Self {
            rules_path: rules_path.to_path_buf(),
            rules,
            scheme,
        })
    }

    pub fn scheme(&self) -> &NumberingScheme {
        &self.scheme
    }

    pub fn rules(&self) -> &NumberingRules {
        &self.rules
    }

    /// Re-reads the rule source this allocator was loaded from.
    pub fn reload_rules(&mut self) {
        self.rules = NumberingRules::load(&self.rules_path);
    }

    /// Raises counters past every id in `existing` that one of the numbering
    /// rules could have produced, and persists the scheme if any counter
    /// moved.
    ///
    /// Ids come from the card index and the documents on disk, so a scheme
    /// that lost its counters still never reissues an id.
    pub fn reconcile_with_existing<'a, I>(
        &mut self,
        existing: I,
        metadata: &MetadataDir,
    ) -> Result<bool>
    where
        I: IntoIterator<Item = &'a CardId>,
    {
        let prefixes = self.rules.bucket_prefixes();
        let mut highest: Vec<(Counter, u64)> = Vec::new();

        for id in existing {
            for (prefix, counter) in &prefixes {
                let Some(digits) = id.as_str().strip_prefix(prefix.as_str()) else {
                    continue;
                };
                if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                    continue;
                }
                if let Ok(value) = digits.parse::<u64>() {
                    highest.push((*counter, value));
                }
            }
        }

        let mut changed = false;
        for (counter, value) in highest {
            changed |= self.scheme.raise_counter(counter, value);
        }
        if changed {
            metadata.save(&self.scheme)?;
        }
        Ok(changed)
    }

    /// Produces the next id for `category` without persisting the scheme.
    ///
    /// Returns the `unknown` sentinel when no rule can number the category.
    pub fn next_id(&mut self, category: &str) -> CardId {
        match self.rules.rule_for(&Category::new(category)) {
            NumberingRule::FixedPrefixIncrement { prefix, counter } => {
                self.scheme
                    .next_in_bucket(&prefix, counter, Counter::bucket_of(category))
            }
            NumberingRule::SubtopicLetter { parent } => self.scheme.next_subtopic(&parent),
            NumberingRule::Unhandled => {
                log::warn!("No numbering rule for category '{category}'");
                CardId::unknown()
            }
        }
    }

    /// Produces the next id for `category` and persists the updated scheme.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the scheme cannot be written; the id is not
    /// handed out in that case since it could be issued again after a reload.
    pub fn allocate(&mut self, category: &str, metadata: &MetadataDir) -> Result<CardId> {
        let id = self.next_id(category);
        metadata.save(&self.scheme)?;
        Ok(id)
    }

    /// Allocates a subtopic under `base_topic`.
    ///
    /// If `base_topic` is not a known main topic, a fresh main topic is
    /// allocated first and the subtopic is nested under it.
    pub fn expand_thematic_structure(
        &mut self,
        base_topic: &str,
        metadata: &MetadataDir,
    ) -> Result<CardId> {
        let is_main_topic = self
            .scheme
            .main_topics
            .iter()
            .any(|id| id.as_str() == base_topic);

        let parent = if is_main_topic {
            base_topic.to_string()
        } else {
            let fresh = self.next_id(Category::MAIN);
            log::info!("'{base_topic}' is not a main topic; created main topic {fresh}");
            fresh.to_string()
        };

        let id = self.scheme.next_subtopic(&parent);
        metadata.save(&self.scheme)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn allocator() -> NumberingAllocator {
        NumberingAllocator::new(NumberingRules::default(), NumberingScheme::default())
    }

    #[test]
    fn main_ids_increase_from_one() {
        let mut alloc = allocator();

        assert_eq!(alloc.next_id("main"), CardId::new("1"));
        assert_eq!(alloc.next_id("main"), CardId::new("2"));
        assert_eq!(alloc.next_id("main"), CardId::new("3"));
    }

    #[test]
    fn buckets_count_independently() {
        let mut alloc = allocator();

        assert_eq!(alloc.next_id("frequent"), CardId::new("A1"));
        assert_eq!(alloc.next_id("quote"), CardId::new("Z1"));
        assert_eq!(alloc.next_id("main"), CardId::new("1"));
        assert_eq!(alloc.next_id("quote"), CardId::new("Z2"));
    }

    #[test]
    fn subtopic_continues_after_existing_children() {
        let mut scheme = NumberingScheme::default();
        scheme
            .subtopics
            .insert("3".to_string(), vec![CardId::new("3a"), CardId::new("3b")]);
        let mut alloc = NumberingAllocator::new(NumberingRules::default(), scheme);

        assert_eq!(alloc.next_id("3"), CardId::new("3c"));
    }

    #[test]
    fn subtopic_after_z_is_aa() {
        let mut scheme = NumberingScheme::default();
        scheme.subtopics.insert(
            "3".to_string(),
            ('a'..='z').map(|c| CardId::new(format!("3{c}"))).collect(),
        );
        let mut alloc = NumberingAllocator::new(NumberingRules::default(), scheme);

        assert_eq!(alloc.next_id("3/anything"), CardId::new("3aa"));
    }

    #[test]
    fn literal_subtopic_category_nests_under_one() {
        let mut alloc = allocator();
        assert_eq!(alloc.next_id("subtopic"), CardId::new("1a"));
    }

    #[test]
    fn unrecognized_category_yields_sentinel() {
        let mut alloc = allocator();

        assert!(alloc.next_id("misc notes").is_unknown());
        assert!(alloc.next_id("").is_unknown());
        assert_eq!(alloc.scheme(), &NumberingScheme::default());
    }

    #[test]
    fn ids_never_repeat_across_reload() {
        let dir = tempdir().unwrap();
        let metadata = MetadataDir::new(dir.path());
        let rules_path = dir.path().join("rules.json");

        let mut first = NumberingAllocator::load(&metadata, &rules_path).unwrap();
        let a = first.allocate("main", &metadata).unwrap();
        let b = first.allocate("main", &metadata).unwrap();
        let q = first.allocate("quote", &metadata).unwrap();
        drop(first);

        let mut second = NumberingAllocator::load(&metadata, &rules_path).unwrap();
        let c = second.allocate("main", &metadata).unwrap();
        let q2 = second.allocate("quote", &metadata).unwrap();

        assert_eq!((a, b, c), (CardId::new("1"), CardId::new("2"), CardId::new("3")));
        assert_eq!((q, q2), (CardId::new("Z1"), CardId::new("Z2")));
    }

    #[test]
    fn configured_category_sharing_main_counter_is_not_a_main_topic() {
        let rules = NumberingRules::from_json(
            r#"{ "zettel_numbering_rules": {
                "main": { "prefix": "", "increment_field": "last_main_topic" },
                "project": { "prefix": "P", "increment_field": "last_main_topic" }
            } }"#,
        );
        let mut alloc = NumberingAllocator::new(rules, NumberingScheme::default());

        assert_eq!(alloc.next_id("main"), CardId::new("1"));
        assert_eq!(alloc.next_id("project"), CardId::new("P2"));
        assert_eq!(alloc.scheme().main_topics, vec![CardId::new("1")]);
    }

    #[test]
    fn reconcile_with_existing_skips_taken_ids() {
        let dir = tempdir().unwrap();
        let metadata = MetadataDir::new(dir.path());
        let mut alloc = allocator();
        let existing = [CardId::new("1"), CardId::new("4"), CardId::new("4b"), CardId::new("Z2")];

        assert!(alloc.reconcile_with_existing(&existing, &metadata).unwrap());
        assert!(!alloc.reconcile_with_existing(&existing, &metadata).unwrap());

        assert_eq!(alloc.next_id("main"), CardId::new("5"));
        assert_eq!(alloc.next_id("quote"), CardId::new("Z3"));
        assert_eq!(alloc.next_id("frequent"), CardId::new("A1"));
        assert!(metadata.exists::<NumberingScheme>());
    }

    #[test]
    fn load_bootstraps_scheme_document() {
        let dir = tempdir().unwrap();
        let metadata = MetadataDir::new(dir.path());

        NumberingAllocator::load(&metadata, &dir.path().join("rules.json")).unwrap();
        assert!(metadata.exists::<NumberingScheme>());
    }

    #[test]
    fn allocate_fails_when_scheme_cannot_be_written() {
        let dir = tempdir().unwrap();
        let metadata = MetadataDir::new(dir.path().join("missing"));
        let mut alloc = allocator();

        assert!(alloc.allocate("main", &metadata).is_err());
    }

    #[test]
    fn expand_under_known_main_topic() {
        let dir = tempdir().unwrap();
        let metadata = MetadataDir::new(dir.path());
        let mut alloc = allocator();
        alloc.next_id("main");

        let id = alloc.expand_thematic_structure("1", &metadata).unwrap();
        assert_eq!(id, CardId::new("1a"));
    }

    #[test]
    fn expand_under_unknown_topic_creates_main_topic() {
        let dir = tempdir().unwrap();
        let metadata = MetadataDir::new(dir.path());
        let mut alloc = allocator();
        alloc.next_id("main");

        let id = alloc.expand_thematic_structure("rivers", &metadata).unwrap();
        assert_eq!(id, CardId::new("2a"));
        assert_eq!(alloc.scheme().main_topics, vec![CardId::new("1"), CardId::new("2")]);
    }

    #[test]
    fn reload_rules_picks_up_new_source() {
        let dir = tempdir().unwrap();
        let metadata = MetadataDir::new(dir.path());
        let rules_path = dir.path().join("rules.json");
        let mut alloc = NumberingAllocator::load(&metadata, &rules_path).unwrap();

        std::fs::write(
            &rules_path,
            r#"{ "zettel_numbering_rules": { "main": { "prefix": "M", "increment_field": "last_main_topic" } } }"#,
        )
        .unwrap();
        alloc.reload_rules();

        assert_eq!(alloc.next_id("main"), CardId::new("M1"));
    }
}
