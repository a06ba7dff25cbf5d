//! Core data models used throughout the harness.
//!
//! These types represent the taxonomy nodes produced by the builder, the
//! raw listing rows a page source returns, and the progress updates the
//! descent classifier emits.

use serde::{Deserialize, Serialize};

/// A node of the classification taxonomy.
///
/// `number` is the canonical classification code (see
/// [`number::canonicalize`](crate::number::canonicalize)). Children are
/// kept in discovery order while building and sorted by the persister
/// before the tree is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyNode {
    pub number: String,
    pub name: String,
    #[serde(default)]
    pub children: Vec<TaxonomyNode>,
}

impl TaxonomyNode {
    pub fn new(number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<TaxonomyNode>) -> Self {
        self.children = children;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// `"<number> <name>"`, the form shown to the oracle.
    pub fn label(&self) -> String {
        format!("{} {}", self.number, self.name)
    }
}

/// One classification row scraped from a listing page, before
/// canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub number: String,
    pub name: String,
}

impl ListingEntry {
    pub fn new(number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            name: name.into(),
        }
    }
}

/// A single step of a descent classification.
///
/// `breadcrumb` is the path of ancestor names that led to this level
/// (empty at the root), not including `name` itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationUpdate {
    pub breadcrumb: String,
    pub name: String,
    pub number: String,
    pub finished: bool,
}
