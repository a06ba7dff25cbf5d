//! Taxonomy persistence.
//!
//! The persisted format is a pretty-printed JSON array of top-level nodes,
//! each `{ "number", "name", "children" }`, with every level sorted by
//! canonical number. Plain string ordering is correct here because integer
//! codes share a fixed width and decimal codes under one parent share
//! their integer prefix.

use anyhow::{Context, Result};
use std::path::Path;

use crate::models::TaxonomyNode;

/// Sort every level of `tree` ascending by number, in place.
pub fn sort_tree(tree: &mut [TaxonomyNode]) {
    tree.sort_by(|a, b| a.number.cmp(&b.number));
    for node in tree.iter_mut() {
        sort_tree(&mut node.children);
    }
}

/// Total number of nodes in `tree`, at every depth.
pub fn count_nodes(tree: &[TaxonomyNode]) -> usize {
    tree.iter().map(|node| 1 + count_nodes(&node.children)).sum()
}

/// Sort `tree` and serialize it to the persisted JSON form.
pub fn to_json(tree: &mut [TaxonomyNode]) -> Result<String> {
    sort_tree(tree);
    serde_json::to_string_pretty(tree).context("Failed to serialize taxonomy")
}

/// Sort `tree`, write it to `path` and return the total node count.
///
/// Works the same on a partial tree from an interrupted build. The file is
/// written to a sibling temporary path first and renamed into place, so an
/// existing taxonomy is never left half-written.
pub fn persist(tree: &mut [TaxonomyNode], path: &Path) -> Result<usize> {
    let json = to_json(tree)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;

    Ok(count_nodes(tree))
}

/// Load a persisted taxonomy.
pub fn load_tree(path: &Path) -> Result<Vec<TaxonomyNode>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read taxonomy file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse taxonomy file: {}", path.display()))
}
