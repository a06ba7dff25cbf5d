//! Breadcrumb documents for semantic search.
//!
//! Flattens the taxonomy into one document per class, carrying the full
//! ancestor path, so that an external embedding pipeline can index the
//! classes for similarity search. Computing embeddings and talking to a
//! vector store is left to that pipeline; `mds documents` only emits the
//! documents as JSON lines.

use anyhow::Result;
use serde::Serialize;
use std::io::Write;

use crate::classify::extend_breadcrumb;
use crate::models::TaxonomyNode;

/// One indexable class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonomyDocument {
    pub number: String,
    pub name: String,
    /// Ancestor names and the class's own name, joined by `" > "`.
    pub breadcrumb: String,
    /// Depth in the tree; 0 for top-level classes.
    pub level: usize,
    /// Text to embed: `"<number> <name>"`, followed by `" — in <parent
    /// breadcrumb>"` below the top level.
    pub text: String,
}

/// Flatten `tree` depth-first, parents before children, in tree order.
pub fn tree_documents(tree: &[TaxonomyNode]) -> Vec<TaxonomyDocument> {
    let mut documents = Vec::new();
    collect(tree, "", 0, &mut documents);
    documents
}

fn collect(nodes: &[TaxonomyNode], parent_breadcrumb: &str, level: usize, out: &mut Vec<TaxonomyDocument>) {
    for node in nodes {
        let mut breadcrumb = parent_breadcrumb.to_string();
        extend_breadcrumb(&mut breadcrumb, &node.name);

        let text = if parent_breadcrumb.is_empty() {
            node.label()
        } else {
            format!("{} \u{2014} in {}", node.label(), parent_breadcrumb)
        };

        out.push(TaxonomyDocument {
            number: node.number.clone(),
            name: node.name.clone(),
            breadcrumb: breadcrumb.clone(),
            level,
            text,
        });

        collect(&node.children, &breadcrumb, level + 1, out);
    }
}

/// Write documents as JSON lines; returns the number written.
pub fn write_documents<W: Write>(documents: &[TaxonomyDocument], mut out: W) -> Result<usize> {
    for document in documents {
        serde_json::to_writer(&mut out, document)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(documents.len())
}
