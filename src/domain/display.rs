//! Console rendering of a forest via termtree.

use termtree::Tree;
use tracing::instrument;

use crate::domain::arena::NodeId;
use crate::domain::forest::{Forest, NodeEntry};

pub trait ToTermTree {
    /// One rendered tree per root, roots ascending.
    fn to_term_trees(&self) -> Vec<Tree<String>>;

    /// All trees joined into a single printable block.
    fn render(&self) -> String {
        let trees = self.to_term_trees();
        if trees.is_empty() {
            return "(empty forest)\n".to_string();
        }
        trees.iter().map(|tree| tree.to_string()).collect()
    }
}

/// Deepest level drawn by [`ToTermTree`]. termtree recurses once per level
/// when printing and dropping, so deeper nodes are replaced by a marker.
pub const MAX_RENDER_DEPTH: usize = 128;

const HIDDEN_MARKER: &str = "... deeper levels hidden (use `dump`)";

impl ToTermTree for Forest {
    // Built from the pre-order dump so deep trees never recurse while building.
    #[instrument(level = "debug", skip(self))]
    fn to_term_trees(&self) -> Vec<Tree<String>> {
        let mut finished = Vec::new();
        let mut open: Vec<Tree<String>> = Vec::new();

        for entry in self.serialize() {
            if entry.depth > MAX_RENDER_DEPTH {
                // first child below the cap stands in for the whole hidden level
                if entry.depth == MAX_RENDER_DEPTH + 1 && entry.previous_sibling.is_none() {
                    close_to_depth(&mut open, entry.depth, &mut finished);
                    if let Some(parent) = open.last_mut() {
                        parent.push(Tree::new(HIDDEN_MARKER.to_string()));
                    }
                }
                continue;
            }
            close_to_depth(&mut open, entry.depth, &mut finished);
            open.push(Tree::new(node_label(&entry)));
        }
        close_to_depth(&mut open, 0, &mut finished);

        finished
    }
}

fn close_to_depth(open: &mut Vec<Tree<String>>, depth: usize, finished: &mut Vec<Tree<String>>) {
    while open.len() > depth {
        let Some(done) = open.pop() else {
            break;
        };
        match open.last_mut() {
            Some(parent) => {
                parent.push(done);
            }
            None => finished.push(done),
        }
    }
}

fn node_label(entry: &NodeEntry) -> String {
    format!("#{} (level {})", entry.id, entry.level)
}

/// One line per node with every link spelled out, for the `dump` views.
pub fn format_entry(entry: &NodeEntry) -> String {
    fn link(id: Option<NodeId>) -> String {
        id.map_or_else(|| "-".to_string(), |id| id.to_string())
    }
    format!(
        "{indent}node {id:<4} parent {parent:<4} first-child {first:<4} next {next:<4} prev {prev:<4} level {level}",
        indent = "  ".repeat(entry.depth),
        id = entry.id,
        parent = link(entry.parent),
        first = link(entry.first_child),
        next = link(entry.next_sibling),
        prev = link(entry.previous_sibling),
        level = entry.level,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_empty_forest_when_rendering_then_says_empty() {
        assert_eq!(Forest::new().render(), "(empty forest)\n");
    }

    #[test]
    fn given_two_trees_when_converting_then_nests_children_in_order() {
        let mut forest = Forest::new();
        let root = forest.allocate();
        let a = forest.allocate_as_child(root).unwrap();
        let _b = forest.allocate_as_child(root).unwrap();
        let _a1 = forest.allocate_as_child(a).unwrap();
        let _other = forest.allocate();

        let trees = forest.to_term_trees();

        assert_eq!(trees.len(), 2);
        assert_eq!(trees[0].root, "#0 (level 0)");
        let labels: Vec<_> = trees[0].leaves.iter().map(|t| t.root.clone()).collect();
        assert_eq!(labels, vec!["#2 (level 1)", "#1 (level 1)"]);
        assert_eq!(trees[0].leaves[1].leaves[0].root, "#3 (level 2)");
        assert_eq!(trees[1].root, "#4 (level 0)");
        assert!(trees[1].leaves.is_empty());
    }

    #[test]
    fn given_chain_deeper_than_cap_when_rendering_then_truncates_with_marker() {
        let mut forest = Forest::new();
        let mut tip = forest.allocate();
        for _ in 0..150_000 {
            tip = forest.allocate_as_child(tip).unwrap();
        }

        let rendered = forest.render();

        assert_eq!(rendered.lines().count(), MAX_RENDER_DEPTH + 2);
        assert!(rendered.contains(&format!("#{} (level {})", MAX_RENDER_DEPTH, MAX_RENDER_DEPTH)));
        assert!(!rendered.contains(&format!("#{} (level", MAX_RENDER_DEPTH + 1)));
        assert_eq!(rendered.matches(HIDDEN_MARKER).count(), 1);
    }

    #[test]
    fn given_wide_level_below_cap_when_rendering_then_one_marker_per_parent() {
        let mut forest = Forest::new();
        let mut tip = forest.allocate();
        for _ in 0..MAX_RENDER_DEPTH {
            tip = forest.allocate_as_child(tip).unwrap();
        }
        for _ in 0..3 {
            forest.allocate_as_child(tip).unwrap();
        }

        let rendered = forest.render();

        assert_eq!(rendered.matches(HIDDEN_MARKER).count(), 1);
        assert_eq!(rendered.lines().count(), MAX_RENDER_DEPTH + 2);
    }

    #[test]
    fn given_entry_when_formatting_then_missing_links_are_dashes() {
        let mut forest = Forest::new();
        let root = forest.allocate();
        let line = format_entry(&forest.serialize()[0]);
        assert_eq!(root.raw(), 0);
        assert!(line.starts_with("node 0    parent -    first-child -"));
        assert!(line.ends_with("level 0"));
    }
}
