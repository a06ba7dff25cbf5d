//! Taxonomy statistics and health overview.
//!
//! Provides a quick summary of a built taxonomy: node and leaf counts,
//! depth, per-class breakdowns, and any violation of the tree invariants
//! (duplicate numbers, children that do not extend their parent's number).
//! Used by `mds stats` to give confidence that a crawl worked.

use std::collections::HashMap;

use crate::models::TaxonomyNode;
use crate::number::is_structural_extension;

/// Per-top-level-class node count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassCount {
    pub number: String,
    pub name: String,
    pub nodes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub total: usize,
    pub leaves: usize,
    /// Number of levels; 0 for an empty tree.
    pub depth: usize,
    pub classes: Vec<ClassCount>,
    /// Numbers that occur more than once.
    pub duplicates: Vec<String>,
    /// `(parent, child)` numbers where the child does not extend the parent.
    pub bad_edges: Vec<(String, String)>,
}

impl TreeStats {
    pub fn collect(tree: &[TaxonomyNode]) -> Self {
        let mut stats = TreeStats::default();
        let mut seen: HashMap<&str, usize> = HashMap::new();

        for root in tree {
            let before = stats.total;
            stats.visit(root, 1, &mut seen);
            stats.classes.push(ClassCount {
                number: root.number.clone(),
                name: root.name.clone(),
                nodes: stats.total - before,
            });
        }

        let mut duplicates: Vec<String> = seen
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(number, _)| number.to_string())
            .collect();
        duplicates.sort();
        stats.duplicates = duplicates;

        stats
    }

    fn visit<'a>(&mut self, node: &'a TaxonomyNode, level: usize, seen: &mut HashMap<&'a str, usize>) {
        self.total += 1;
        self.depth = self.depth.max(level);
        *seen.entry(node.number.as_str()).or_default() += 1;

        if node.is_leaf() {
            self.leaves += 1;
        }

        for child in &node.children {
            if !is_structural_extension(&node.number, &child.number) {
                self.bad_edges
                    .push((node.number.clone(), child.number.clone()));
            }
            self.visit(child, level + 1, seen);
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.duplicates.is_empty() && self.bad_edges.is_empty()
    }

    /// Print the summary to stdout.
    pub fn print(&self, source: &str) {
        println!("Taxonomy Stats");
        println!("==============");
        println!();
        println!("  File:        {}", source);
        println!("  Nodes:       {}", self.total);
        println!("  Leaves:      {}", self.leaves);
        println!("  Depth:       {}", self.depth);
        println!();

        if !self.classes.is_empty() {
            println!("  By class:");
            for class in &self.classes {
                println!("    {} {:<40} {:>7}", class.number, class.name, class.nodes);
            }
            println!();
        }

        if self.is_consistent() {
            println!("  Invariants:  ok");
        } else {
            println!(
                "  Invariants:  {} duplicate numbers, {} misplaced children",
                self.duplicates.len(),
                self.bad_edges.len()
            );
            for number in &self.duplicates {
                println!("    duplicate {}", number);
            }
            for (parent, child) in &self.bad_edges {
                println!("    {} is not an extension of {}", child, parent);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect() {
        let tree = vec![
            TaxonomyNode::new("500", "Science"),
            TaxonomyNode::new("600", "Technology").with_children(vec![
                TaxonomyNode::new("630", "Agriculture")
                    .with_children(vec![TaxonomyNode::new("636.7", "Dogs")]),
                TaxonomyNode::new("640", "Home"),
            ]),
        ];

        let stats = TreeStats::collect(&tree);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.leaves, 3);
        assert_eq!(stats.depth, 3);
        assert_eq!(stats.classes[1].nodes, 4);
        assert!(stats.is_consistent());
    }

    #[test]
    fn test_detects_violations() {
        let tree = vec![
            TaxonomyNode::new("600", "Technology")
                .with_children(vec![TaxonomyNode::new("530", "Physics")]),
            TaxonomyNode::new("600", "Technology again"),
        ];

        let stats = TreeStats::collect(&tree);
        assert_eq!(stats.duplicates, vec!["600".to_string()]);
        assert_eq!(stats.bad_edges, vec![("600".to_string(), "530".to_string())]);
        assert!(!stats.is_consistent());
    }

    #[test]
    fn test_empty_tree() {
        let stats = TreeStats::collect(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.depth, 0);
        assert!(stats.is_consistent());
    }
}
