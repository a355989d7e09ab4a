use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Config;
use crate::connections::{ConnectionCache, ThematicConnectionFinder};
use crate::document::{self, MIRROR_FILE_NAME};
use crate::error::{Result, StoreError};
use crate::graph::CrossReferenceGraph;
use crate::metadata::MetadataDir;
use crate::models::{Card, CardBuilder, CardId, CardIndex, CardSummary, Category};
use crate::numbering::{Counter, NumberingAllocator, NumberingScheme, UNKNOWN_FILE_CATEGORY};

/// Card folders created when a store is opened.
pub const SECTIONS: [&str; 7] = ["1", "2", "3", "4", "5", "A", "Z"];

/// Parameters for [`CardStore::create_card`].
///
/// # Examples
///
/// ```
/// use zettel::{CardId, NewCard};
///
/// let request = NewCard::new("Rivers", "Notes on rivers")
///     .category("main")
///     .tags(["geography"])
///     .cross_references([CardId::new("2")]);
///
/// assert_eq!(request.category, "main");
/// assert_eq!(request.tags, vec!["geography"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCard {
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub cross_references: Vec<CardId>,
    /// Extra folder that receives a copy of the document as `00_zettel.md`.
    pub secondary_location: Option<PathBuf>,
}

impl NewCard {
    /// A main-topic card with no tags or cross-references.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category: Category::MAIN.to_string(),
            tags: Vec::new(),
            cross_references: Vec::new(),
            secondary_location: None,
        }
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

    pub fn secondary_location(mut self, folder: impl Into<PathBuf>) -> Self {
        self.secondary_location = Some(folder.into());
        self
    }
}

/// Collection-wide counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total_cards: usize,
    pub main_topics: usize,
    pub frequently_accessed: usize,
    pub quotes_excerpts: usize,
    /// Cards with at least one cross-reference entry.
    pub cross_references: usize,
    /// Undirected cross-reference edges.
    pub cross_reference_edges: usize,
    pub subtopics: usize,
    pub directories: Vec<PathBuf>,
}

/// Owner of a card collection on disk.
///
/// Holds the numbering scheme, the card index, the cross-reference graph and
/// the connection cache in memory and writes each one back in full after
/// every change. Mutating operations take `&mut self`: a store has a single
/// writer.
///
/// Card creation writes the document, then the index, then the graph, with
/// no rollback between steps. [`repair_index`](Self::repair_index) and a
/// full search index rebuild bring derived state back in line.
///
/// # Examples
///
/// ```
/// use zettel::{CardStore, Config, NewCard};
///
/// # fn main() -> zettel::Result<()> {
/// let dir = tempfile::tempdir().expect("tempdir");
/// let mut store = CardStore::open(Config::with_root(dir.path()))?;
///
/// let first = store.create_card(NewCard::new("Rivers", "Notes on rivers"))?;
/// let sub = store.create_card(NewCard::new("Deltas", "River mouths").category("1"))?;
///
/// assert_eq!(first.id.as_str(), "1");
/// assert_eq!(sub.id.as_str(), "1a");
/// # Ok(())
/// # }
/// ```
pub struct CardStore {
    config: Config,
    metadata: MetadataDir,
    allocator: NumberingAllocator,
    index: CardIndex,
    graph: CrossReferenceGraph,
    connections: ConnectionCache,
}

impl CardStore {
    /// Opens the collection described by `config`, creating its folders and
    /// state documents as needed.
    ///
    /// One-directional links found in the stored graph are mirrored and the
    /// graph is written back. Numbering counters are raised past every id
    /// already present in the card index or as a document on disk.
    pub fn open(config: Config) -> Result<Self> {
        for section in SECTIONS {
            let folder = config.base_dir.join(section);
            fs::create_dir_all(&folder).map_err(|e| StoreError::io(&folder, e))?;
        }

        let metadata = MetadataDir::new(&config.metadata_dir);
        metadata.init()?;

        let mut allocator = NumberingAllocator::load(&metadata, &config.rules_path)?;
        let index: CardIndex = metadata.load();
        let on_disk = card_documents(&config.base_dir)?;
        allocator.reconcile_with_existing(index.ids().chain(&on_disk), &metadata)?;
        let connections: ConnectionCache = metadata.load();

        let mut graph: CrossReferenceGraph = metadata.load();
        let repaired = graph.symmetrize();
        if repaired > 0 {
            log::warn!("Mirrored {repaired} one-directional cross-references");
            metadata.save(&graph)?;
        }

        log::debug!(
            "Opened card store at {} with {} cards",
            config.base_dir.display(),
            index.len()
        );

        Ok(Self {
            config,
            metadata,
            allocator,
            index,
            graph,
            connections,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &CardIndex {
        &self.index
    }

    pub fn graph(&self) -> &CrossReferenceGraph {
        &self.graph
    }

    pub fn connections(&self) -> &ConnectionCache {
        &self.connections
    }

    pub fn scheme(&self) -> &NumberingScheme {
        self.allocator.scheme()
    }

    /// Creates a card: allocates its id, writes its document, registers it in
    /// the index and links it with its cross-references.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UnknownCategory`] if no numbering rule matches the
    ///   category; no card is written in that case.
    /// - [`StoreError::IdCollision`] if the allocated id is already indexed
    ///   or its document exists. The existing card is left untouched.
    /// - [`StoreError::Io`] if a document or state file cannot be written.
    ///   Steps completed before the failure are kept.
    pub fn create_card(&mut self, request: NewCard) -> Result<Card> {
        let id = self.allocator.allocate(&request.category, &self.metadata)?;
        if id.is_unknown() {
            return Err(StoreError::UnknownCategory(request.category));
        }

        let folder = self
            .config
            .base_dir
            .join(Category::new(request.category.as_str()).folder_name());
        fs::create_dir_all(&folder).map_err(|e| StoreError::io(&folder, e))?;
        let file_path = folder.join(format!("{id}.md"));
        if self.index.contains(&id) || file_path.exists() {
            log::error!("Allocated id {id} is already taken by an existing card");
            return Err(StoreError::IdCollision(id));
        }

        let card = CardBuilder::new(id.clone(), request.title)
            .content(request.content)
            .category(request.category)
            .tags(request.tags)
            .cross_references(request.cross_references.iter().cloned())
            .file_path(&file_path)
            .build();

        let related = ThematicConnectionFinder::new(&self.index).find_zettel_connections(&card);
        let rendered = document::render(&card, &related)?;
        fs::write(&file_path, &rendered).map_err(|e| StoreError::io(&file_path, e))?;

        if let Some(extra) = &request.secondary_location {
            fs::create_dir_all(extra).map_err(|e| StoreError::io(extra, e))?;
            let mirror = extra.join(MIRROR_FILE_NAME);
            fs::write(&mirror, &rendered).map_err(|e| StoreError::io(&mirror, e))?;
        }

        self.index.insert(id.clone(), card.summary());
        self.add_links(&id, &request.cross_references);
        self.metadata.save(&self.index)?;
        self.metadata.save(&self.graph)?;

        self.connections
            .record(id.clone(), related.into_iter().map(|c| c.id).collect());
        self.metadata.save(&self.connections)?;

        log::info!("Created card {id} at {}", file_path.display());
        Ok(card)
    }

    /// Index entry for `id`. Tag and cross-reference sets are always present,
    /// possibly empty.
    pub fn get_card(&self, id: &CardId) -> Option<CardSummary> {
        self.index.get(id).cloned()
    }

    /// Cards whose title or content contains `query`, ignoring case.
    ///
    /// Content is the summary section of the card document; the fixed
    /// template text around it is never matched. Documents that cannot be
    /// read are matched on their title only.
    pub fn search_cards(&self, query: &str) -> Vec<(CardId, CardSummary)> {
        let needle = query.to_lowercase();

        self.index
            .iter()
            .filter(|(_, summary)| {
                summary.title.to_lowercase().contains(&needle)
                    || fs::read_to_string(&summary.file_path).is_ok_and(|text| {
                        document::summary_section(&text)
                            .to_lowercase()
                            .contains(&needle)
                    })
            })
            .map(|(id, summary)| (id.clone(), summary.clone()))
            .collect()
    }

    /// Cross-references `source` with every id in `targets`, in both
    /// directions. Ids that are not indexed get graph edges only.
    ///
    /// Returns the number of newly linked pairs.
    pub fn link(&mut self, source: &CardId, targets: &[CardId]) -> Result<usize> {
        let added = self.add_links(source, targets);
        if added > 0 {
            self.metadata.save(&self.graph)?;
            self.metadata.save(&self.index)?;
        }
        Ok(added)
    }

    /// Indexed cards whose title shares at least two words with `text`.
    pub fn suggest_connections(&self, text: &str, candidates: Option<&[CardId]>) -> Vec<CardId> {
        ThematicConnectionFinder::new(&self.index).find_thematic_connections(text, candidates)
    }

    /// Creates a card in the frequently-accessed bucket pointing at a file.
    pub fn create_frequently_accessed_card(
        &mut self,
        file_path: &Path,
        description: &str,
    ) -> Result<Card> {
        let name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_path.display().to_string());

        let mut tags = vec!["frequently-accessed".to_string(), "file-reference".to_string()];
        let file_category = self.categorize(file_path);
        if file_category != UNKNOWN_FILE_CATEGORY {
            tags.push(file_category.to_string());
        }

        let request = NewCard::new(
            format!("Frequently Accessed: {name}"),
            format!(
                "Frequently accessed file: {}\n\n{description}",
                file_path.display()
            ),
        )
        .category(Category::FREQUENT)
        .tags(tags);

        self.create_card(request)
    }

    /// Creates a card in the quote bucket.
    pub fn create_quote_card(&mut self, quote: &str, source: &str, context: &str) -> Result<Card> {
        let mut tags = vec!["quote", "excerpt"];
        if !source.trim().is_empty() {
            tags.push(source.trim());
        }

        let request = NewCard::new(
            format!("Quote: {source}"),
            format!("**Quote:** {quote}\n\n**Source:** {source}\n\n**Context:** {context}"),
        )
        .category(Category::QUOTE)
        .tags(tags);

        self.create_card(request)
    }

    /// Allocates a subtopic id under `base_topic`, creating a new main topic
    /// first when `base_topic` is not one.
    pub fn expand_thematic_structure(&mut self, base_topic: &str) -> Result<CardId> {
        self.allocator
            .expand_thematic_structure(base_topic, &self.metadata)
    }

    /// File category for `path` according to the file categorization rules.
    pub fn categorize(&self, path: &Path) -> &str {
        self.allocator.rules().categorize(path)
    }

    /// Re-reads the rule source.
    pub fn reload_rules(&mut self) {
        self.allocator.reload_rules();
        log::info!("Reloaded rules from {}", self.config.rules_path.display());
    }

    /// Rewrites the card index so every entry carries list-valued tags and
    /// cross-references, and copies graph edges missing from entries.
    ///
    /// Returns the number of entries that changed.
    pub fn repair_index(&mut self) -> Result<usize> {
        let mut repaired = self.malformed_entries();

        for (id, summary) in self.index.iter_mut() {
            for related in self.graph.related(id) {
                if summary.cross_references.insert(related.clone()) {
                    repaired.insert(id.clone());
                }
            }
        }

        self.metadata.save(&self.index)?;
        log::info!("Repaired {} card index entries", repaired.len());
        Ok(repaired.len())
    }

    /// Folders directly under the card directory, sorted.
    pub fn list_directories(&self) -> Result<Vec<PathBuf>> {
        let base = &self.config.base_dir;
        let entries = fs::read_dir(base).map_err(|e| StoreError::io(base, e))?;

        let mut dirs = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(base, e))?.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    pub fn get_statistics(&self) -> Result<Statistics> {
        let scheme = self.allocator.scheme();
        Ok(Statistics {
            total_cards: self.index.len(),
            main_topics: scheme.members(Counter::MainTopic).len(),
            frequently_accessed: scheme.members(Counter::Frequent).len(),
            quotes_excerpts: scheme.members(Counter::Quote).len(),
            cross_references: self.graph.len(),
            cross_reference_edges: self.graph.edge_count(),
            subtopics: scheme.subtopic_count(),
            directories: self.list_directories()?,
        })
    }

    /// Adds graph edges and mirrors each new pair into the index entries of
    /// both ends. Persists nothing.
    fn add_links(&mut self, source: &CardId, targets: &[CardId]) -> usize {
        let added = self.graph.add_edges(source, targets);
        for (a, b) in &added {
            if let Some(summary) = self.index.get_mut(a) {
                summary.cross_references.insert(b.clone());
            }
            if let Some(summary) = self.index.get_mut(b) {
                summary.cross_references.insert(a.clone());
            }
        }
        added.len()
    }

    /// Ids whose stored entry holds a missing or non-list tag or
    /// cross-reference field.
    fn malformed_entries(&self) -> BTreeSet<CardId> {
        let path = self.metadata.file_path::<CardIndex>();
        let Ok(text) = fs::read_to_string(&path) else {
            return BTreeSet::new();
        };
        let Ok(serde_json::Value::Object(entries)) = serde_json::from_str::<serde_json::Value>(&text)
        else {
            return BTreeSet::new();
        };

        entries
            .into_iter()
            .filter(|(_, entry)| {
                ["tags", "cross_references"]
                    .iter()
                    .any(|field| !entry.get(field).is_some_and(serde_json::Value::is_array))
            })
            .map(|(id, _)| CardId::new(id))
            .collect()
    }
}

/// Ids of the card documents (`<id>.md`) in the folders under `base`.
fn card_documents(base: &Path) -> Result<Vec<CardId>> {
    let mut ids = Vec::new();
    let folders = fs::read_dir(base).map_err(|e| StoreError::io(base, e))?;
    for folder in folders {
        let folder = folder.map_err(|e| StoreError::io(base, e))?.path();
        if !folder.is_dir() {
            continue;
        }
        let entries = fs::read_dir(&folder).map_err(|e| StoreError::io(&folder, e))?;
        for entry in entries {
            let path = entry.map_err(|e| StoreError::io(&folder, e))?.path();
            if !path.extension().is_some_and(|ext| ext == "md") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                ids.push(CardId::new(stem));
            }
        }
    }
    Ok(ids)
}
