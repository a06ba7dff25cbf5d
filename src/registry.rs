//! Build-time node registry.
//!
//! The registry owns every node discovered during one build run in an
//! arena and indexes them by canonical number, which gives O(1) duplicate
//! suppression and parent lookup. Parent/child links are arena indices, so
//! nodes can be attached while their subtrees are still being discovered.
//! [`NodeRegistry::snapshot`] turns the arena into owned
//! [`TaxonomyNode`] trees; it can be called at any time, including after
//! an interrupted build.

use std::collections::HashMap;

use crate::models::{ListingEntry, TaxonomyNode};
use crate::number::{candidate_ancestors, canonicalize, is_top_level};

/// Index of a node inside a [`NodeRegistry`].
pub type NodeId = usize;

#[derive(Debug)]
struct RegistryNode {
    number: String,
    name: String,
    children: Vec<NodeId>,
}

/// Outcome of [`NodeRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// A new node was created under the given parent (`None` for top-level).
    Created { id: NodeId, parent: Option<NodeId> },
    /// A node with the same canonical number already exists; nothing changed.
    Existing(NodeId),
    /// No candidate ancestor is registered; the entry was dropped.
    Unattachable,
}

/// Arena of taxonomy nodes keyed by canonical number.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: Vec<RegistryNode>,
    by_number: HashMap<String, NodeId>,
    roots: Vec<NodeId>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by canonical number.
    pub fn lookup(&self, number: &str) -> Option<NodeId> {
        self.by_number.get(number).copied()
    }

    pub fn number(&self, id: NodeId) -> &str {
        &self.nodes[id].number
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id].name
    }

    /// Resolve the parent of a raw number: the first registered
    /// [`candidate_ancestors`] entry.
    pub fn resolve_parent(&self, raw: &str) -> Option<NodeId> {
        candidate_ancestors(raw)
            .iter()
            .find_map(|candidate| self.lookup(candidate))
    }

    /// Register a listing entry.
    ///
    /// Idempotent per canonical number: an entry whose number is already
    /// registered is never inserted again, whichever parent it was
    /// rediscovered under.
    pub fn register(&mut self, entry: &ListingEntry) -> Registration {
        let number = canonicalize(&entry.number);
        if let Some(id) = self.lookup(&number) {
            return Registration::Existing(id);
        }

        let parent = if is_top_level(&entry.number) {
            None
        } else {
            match self.resolve_parent(&entry.number) {
                Some(parent) => Some(parent),
                None => return Registration::Unattachable,
            }
        };

        let id = self.nodes.len();
        self.nodes.push(RegistryNode {
            number: number.clone(),
            name: entry.name.clone(),
            children: Vec::new(),
        });
        self.by_number.insert(number, id);

        match parent {
            Some(parent) => self.nodes[parent].children.push(id),
            None => self.roots.push(id),
        }

        Registration::Created { id, parent }
    }

    /// Materialize the registered nodes as owned trees, in discovery order.
    pub fn snapshot(&self) -> Vec<TaxonomyNode> {
        self.roots.iter().map(|&id| self.materialize(id)).collect()
    }

    fn materialize(&self, id: NodeId) -> TaxonomyNode {
        let node = &self.nodes[id];
        TaxonomyNode {
            number: node.number.clone(),
            name: node.name.clone(),
            children: node
                .children
                .iter()
                .map(|&child| self.materialize(child))
                .collect(),
        }
    }
}
