use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::metadata::Document;
use crate::models::CardId;

/// Symmetric "related-to" edges between cards.
///
/// Every edge is stored in both directions. The graph only grows: there is
/// no removal operation. Persisted as `cross_references.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrossReferenceGraph {
    adjacency: BTreeMap<CardId, BTreeSet<CardId>>,
}

impl Document for CrossReferenceGraph {
    const FILE_NAME: &'static str = "cross_references.json";
}

impl CrossReferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Links `source` with every id in `targets`, in both directions.
    ///
    /// Re-adding an existing edge is a no-op and self-links are ignored.
    /// Returns the pairs that were newly linked.
    ///
    /// # Examples
    ///
    /// ```
    /// use zettel::{CardId, CrossReferenceGraph};
    ///
    /// let (a, b, c) = (CardId::new("1"), CardId::new("2"), CardId::new("3"));
    /// let mut graph = CrossReferenceGraph::new();
    /// graph.add_edges(&a, &[b.clone(), c.clone()]);
    /// graph.add_edges(&b, &[a.clone()]);
    ///
    /// assert_eq!(graph.edge_count(), 2);
    /// assert!(graph.contains_edge(&c, &a));
    /// ```
    pub fn add_edges(&mut self, source: &CardId, targets: &[CardId]) -> Vec<(CardId, CardId)> {
        let mut added = Vec::new();
        for target in targets {
            if target == source {
                continue;
            }
            let forward = self
                .adjacency
                .entry(source.clone())
                .or_default()
                .insert(target.clone());
            let backward = self
                .adjacency
                .entry(target.clone())
                .or_default()
                .insert(source.clone());
            if forward || backward {
                added.push((source.clone(), target.clone()));
            }
        }
        added
    }

    /// Ids related to `id`, empty if it has no edges.
    pub fn related<'a>(&'a self, id: &CardId) -> impl Iterator<Item = &'a CardId> + use<'a> {
        self.adjacency.get(id).into_iter().flatten()
    }

    pub fn contains_edge(&self, a: &CardId, b: &CardId) -> bool {
        self.adjacency.get(a).is_some_and(|set| set.contains(b))
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// Number of cards with at least one entry in the adjacency map.
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Re-adds any missing reverse edge.
    ///
    /// Documents written by hand or by older tools may hold one-directional
    /// links; they are mirrored on load. Returns the number of edges repaired.
    pub fn symmetrize(&mut self) -> usize {
        let missing: Vec<(CardId, CardId)> = self
            .adjacency
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |to| (from.clone(), to.clone())))
            .filter(|(from, to)| from != to && !self.contains_edge(to, from))
            .collect();

        for (from, to) in &missing {
            self.adjacency
                .entry(to.clone())
                .or_default()
                .insert(from.clone());
        }
        for (id, targets) in self.adjacency.iter_mut() {
            targets.remove(id);
        }
        missing.len()
    }
}
