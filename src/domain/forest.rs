//! Forest of multi-way trees sharing one node arena.
//!
//! Children are kept as an intrusive doubly linked sibling list hanging off
//! `first_child`. New children are inserted at the head, so the most recently
//! attached child is enumerated first. All subtree walks use an explicit work
//! stack.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

use crate::domain::arena::{Arena, NodeId};
use crate::domain::error::{ForestError, ForestResult};

/// Distance in parent edges from a node to its root.
pub type Level = u32;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct NodeRecord {
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
    previous_sibling: Option<NodeId>,
    level: Level,
}

/// One visited node of [`Forest::serialize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeEntry {
    pub id: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_child: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_sibling: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_sibling: Option<NodeId>,
    /// Stored level (may be stale after [`Forest::orphan`])
    pub level: Level,
    /// Depth of the node in the traversal, root = 0
    pub depth: usize,
}

/// Result of [`Forest::orphan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrphanOutcome {
    /// The node was detached and is now a root
    Detached,
    /// The node had no parent; nothing changed
    AlreadyRoot,
}

#[derive(Debug, Default)]
pub struct Forest {
    nodes: Arena<NodeId, NodeRecord>,
    roots: BTreeSet<NodeId>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------

    /// Allocates a node (recycling the last freed handle if any) as a new root
    /// at level 0.
    #[instrument(level = "trace", skip(self))]
    pub fn allocate(&mut self) -> NodeId {
        let id = self.nodes.allocate();
        self.roots.insert(id);
        debug!("allocated node {}", id);
        id
    }

    /// Makes `child` the first child of `parent`, detaching it from wherever it
    /// currently hangs. Levels of the whole `child` subtree are recomputed.
    #[instrument(level = "trace", skip(self))]
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> ForestResult<()> {
        self.validate(parent)?;
        self.validate(child)?;
        self.ensure_acyclic(child, parent)?;
        self.reparent(child, parent)?;
        debug!("attached node {} under {}", child, parent);
        Ok(())
    }

    /// Allocates a new node directly under `parent`.
    ///
    /// `parent` is validated first, so a bad handle allocates nothing.
    #[instrument(level = "trace", skip(self))]
    pub fn allocate_as_child(&mut self, parent: NodeId) -> ForestResult<NodeId> {
        let parent_level = self.level_of(parent)?;
        let child = self.nodes.allocate();
        self.link_first_child(parent, child)?;
        self.nodes.get_mut(child)?.level = parent_level + 1;
        debug!("allocated node {} under {}", child, parent);
        Ok(child)
    }

    /// Moves `node` (with its subtree) to become the first child of `new_parent`.
    ///
    /// Fails with [`ForestError::CycleDetected`] if `new_parent` is `node` or
    /// lies inside its subtree. Inverting the hierarchy is not supported.
    #[instrument(level = "trace", skip(self))]
    pub fn move_node(&mut self, node: NodeId, new_parent: NodeId) -> ForestResult<()> {
        self.validate(node)?;
        self.validate(new_parent)?;
        self.ensure_acyclic(node, new_parent)?;
        self.reparent(node, new_parent)?;
        debug!("moved node {} under {}", node, new_parent);
        Ok(())
    }

    /// Removes `node` and its whole subtree.
    ///
    /// Descendants are freed in post-order (children before their owner,
    /// siblings in enumeration order) and `node` is freed last, so `node` is
    /// the first handle the next allocation reissues. Returns the freed handles
    /// in the order they were freed.
    #[instrument(level = "trace", skip(self))]
    pub fn remove(&mut self, node: NodeId) -> ForestResult<Vec<NodeId>> {
        self.validate(node)?;
        let freed = self.post_order(node)?;

        for &descendant in freed.iter().filter(|&&id| id != node) {
            self.nodes.free(descendant)?;
            trace!("freed descendant {}", descendant);
        }
        self.unlink(node)?;
        self.nodes.free(node)?;

        debug!("removed node {} ({} nodes freed)", node, freed.len());
        Ok(freed)
    }

    /// Detaches `node` from its parent and makes it a root.
    ///
    /// Levels of `node` and its subtree are left as they were, so they no
    /// longer satisfy `level == parent level + 1` relative to the new root.
    /// Call [`Forest::recompute_levels`] to repair them.
    #[instrument(level = "trace", skip(self))]
    pub fn orphan(&mut self, node: NodeId) -> ForestResult<OrphanOutcome> {
        if self.parent_of(node)?.is_none() {
            warn!("node {} is already an orphan", node);
            return Ok(OrphanOutcome::AlreadyRoot);
        }
        self.unlink(node)?;
        self.roots.insert(node);
        debug!("orphaned node {}", node);
        Ok(OrphanOutcome::Detached)
    }

    /// Recomputes levels of `node`'s subtree from its current position: one
    /// below its parent, or 0 for a root.
    #[instrument(level = "trace", skip(self))]
    pub fn recompute_levels(&mut self, node: NodeId) -> ForestResult<()> {
        let base = match self.parent_of(node)? {
            Some(parent) => self.level_of(parent)? + 1,
            None => 0,
        };
        self.set_subtree_level(node, base)
    }

    // ------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------

    pub fn level_of(&self, node: NodeId) -> ForestResult<Level> {
        Ok(self.nodes.get(node)?.level)
    }

    pub fn parent_of(&self, node: NodeId) -> ForestResult<Option<NodeId>> {
        Ok(self.nodes.get(node)?.parent)
    }

    /// Immediate children, most recently attached first.
    pub fn children_of(&self, node: NodeId) -> ForestResult<Vec<NodeId>> {
        Ok(self.children(node)?.collect())
    }

    /// Lazy iterator over the sibling chain below `node`.
    pub fn children(&self, node: NodeId) -> ForestResult<Children<'_>> {
        let next = self.nodes.get(node)?.first_child;
        Ok(Children { forest: self, next })
    }

    /// Snapshot of all roots, ascending by handle.
    pub fn roots(&self) -> Vec<NodeId> {
        self.roots.iter().copied().collect()
    }

    /// True iff `ancestor` is on the parent chain of `descendant`.
    /// A node is not its own descendant.
    pub fn is_descendant(&self, ancestor: NodeId, descendant: NodeId) -> ForestResult<bool> {
        self.validate(ancestor)?;
        self.validate(descendant)?;
        self.on_parent_chain(ancestor, descendant)
    }

    /// `node` followed by its descendants in pre-order.
    pub fn subtree(&self, node: NodeId) -> ForestResult<Vec<NodeId>> {
        self.validate(node)?;
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            out.push(id);
            let children = self.children_of(id)?;
            stack.extend(children.into_iter().rev());
        }
        Ok(out)
    }

    /// Depth-first pre-order dump of every tree, roots ascending.
    pub fn serialize(&self) -> Vec<NodeEntry> {
        let mut entries = Vec::with_capacity(self.nodes.len());
        for &root in &self.roots {
            let mut stack = vec![(root, 0usize)];
            while let Some((id, depth)) = stack.pop() {
                let Ok(record) = self.nodes.get(id) else {
                    continue;
                };
                entries.push(NodeEntry {
                    id,
                    parent: record.parent,
                    first_child: record.first_child,
                    next_sibling: record.next_sibling,
                    previous_sibling: record.previous_sibling,
                    level: record.level,
                    depth,
                });
                let children: Vec<NodeId> = self.children(id).into_iter().flatten().collect();
                stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
            }
        }
        entries
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(node)
    }

    /// Handles waiting for reuse; the last one is reissued next.
    pub fn free_handles(&self) -> &[NodeId] {
        self.nodes.free_list()
    }

    // ------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------

    fn validate(&self, node: NodeId) -> ForestResult<()> {
        self.nodes.get(node).map(|_| ())
    }

    fn ensure_acyclic(&self, node: NodeId, new_parent: NodeId) -> ForestResult<()> {
        if node == new_parent || self.on_parent_chain(node, new_parent)? {
            return Err(ForestError::CycleDetected { node, new_parent });
        }
        Ok(())
    }

    /// Verifies sibling links, first-child links, root bookkeeping, acyclicity
    /// and reachability. Levels are checked separately by
    /// [`Forest::check_levels`].
    pub fn check_invariants(&self) -> ForestResult<()> {
        for (id, record) in self.nodes.iter() {
            if let Some(next) = record.next_sibling {
                let next_record = self.linked(id, next, "next sibling")?;
                if next_record.previous_sibling != Some(id) {
                    return Err(corrupted(id, format!("next sibling {} does not point back", next)));
                }
                if next_record.parent != record.parent {
                    return Err(corrupted(id, format!("sibling {} has a different parent", next)));
                }
            }
            if let Some(previous) = record.previous_sibling {
                if self.linked(id, previous, "previous sibling")?.next_sibling != Some(id) {
                    return Err(corrupted(id, format!("previous sibling {} does not point back", previous)));
                }
            }
            if let Some(first) = record.first_child {
                let child = self.linked(id, first, "first child")?;
                if child.previous_sibling.is_some() {
                    return Err(corrupted(id, format!("first child {} has a previous sibling", first)));
                }
                if child.parent != Some(id) {
                    return Err(corrupted(id, format!("first child {} names another parent", first)));
                }
            }
            match record.parent {
                Some(parent) => {
                    self.linked(id, parent, "parent")?;
                    if self.roots.contains(&id) {
                        return Err(corrupted(id, "node with a parent is in the root set"));
                    }
                }
                None => {
                    if !self.roots.contains(&id) {
                        return Err(corrupted(id, "parentless node is missing from the root set"));
                    }
                    if record.next_sibling.is_some() || record.previous_sibling.is_some() {
                        return Err(corrupted(id, "root has siblings"));
                    }
                }
            }
            self.check_parent_chain(id)?;
        }

        if let Some(&stale) = self.roots.iter().find(|&&root| !self.nodes.contains(root)) {
            return Err(corrupted(stale, "root set names a freed node"));
        }
        if let Some(&live) = self.nodes.free_list().iter().find(|&&id| self.nodes.contains(id)) {
            return Err(corrupted(live, "free list names a live node"));
        }
        self.check_reachability()
    }

    /// Verifies `level == parent level + 1` for every node with a parent.
    pub fn check_levels(&self) -> ForestResult<()> {
        for (id, record) in self.nodes.iter() {
            if let Some(parent) = record.parent {
                let expected = self.level_of(parent)? + 1;
                if record.level != expected {
                    return Err(corrupted(
                        id,
                        format!("level {} but parent {} implies {}", record.level, parent, expected),
                    ));
                }
            }
        }
        Ok(())
    }

    fn linked(&self, from: NodeId, to: NodeId, what: &str) -> ForestResult<&NodeRecord> {
        self.nodes
            .get(to)
            .map_err(|_| corrupted(from, format!("{} {} is not live", what, to)))
    }

    fn check_parent_chain(&self, node: NodeId) -> ForestResult<()> {
        let mut steps = 0;
        let mut current = self.nodes.get(node)?.parent;
        while let Some(parent) = current {
            steps += 1;
            if steps > self.nodes.len() {
                return Err(corrupted(node, "parent chain does not terminate"));
            }
            current = self.nodes.get(parent)?.parent;
        }
        Ok(())
    }

    fn check_reachability(&self) -> ForestResult<()> {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        for &root in &self.roots {
            let mut stack = vec![(root, None)];
            while let Some((id, from)) = stack.pop() {
                if !seen.insert(id) {
                    return Err(corrupted(id, "reachable more than once"));
                }
                let record = self.nodes.get(id)?;
                if record.parent != from {
                    return Err(corrupted(id, "listed under a node that is not its parent"));
                }
                let mut steps = 0;
                let mut child = record.first_child;
                while let Some(c) = child {
                    steps += 1;
                    if steps > self.nodes.len() {
                        return Err(corrupted(id, "sibling chain loops"));
                    }
                    stack.push((c, Some(id)));
                    child = self.nodes.get(c)?.next_sibling;
                }
            }
        }
        if let Some((unreached, _)) = self.nodes.iter().find(|(id, _)| !seen.contains(id)) {
            return Err(corrupted(unreached, "not reachable from any root"));
        }
        Ok(())
    }

    // ------------------------------------------------------------
    // Linking primitives (callers validate first)
    // ------------------------------------------------------------

    fn on_parent_chain(&self, ancestor: NodeId, descendant: NodeId) -> ForestResult<bool> {
        let mut current = self.nodes.get(descendant)?.parent;
        while let Some(parent) = current {
            if parent == ancestor {
                return Ok(true);
            }
            current = self.nodes.get(parent)?.parent;
        }
        Ok(false)
    }

    fn reparent(&mut self, node: NodeId, new_parent: NodeId) -> ForestResult<()> {
        self.unlink(node)?;
        self.link_first_child(new_parent, node)?;
        let base = self.level_of(new_parent)? + 1;
        self.set_subtree_level(node, base)
    }

    /// Splices `node` out of its sibling list (or the root set) and clears its
    /// parent and sibling links. Its own children stay attached.
    fn unlink(&mut self, node: NodeId) -> ForestResult<()> {
        let (parent, previous, next) = {
            let record = self.nodes.get(node)?;
            (record.parent, record.previous_sibling, record.next_sibling)
        };

        match parent {
            Some(parent) => {
                let parent_record = self.nodes.get_mut(parent)?;
                if parent_record.first_child == Some(node) {
                    parent_record.first_child = next;
                }
            }
            None => {
                self.roots.remove(&node);
            }
        }
        if let Some(previous) = previous {
            self.nodes.get_mut(previous)?.next_sibling = next;
        }
        if let Some(next) = next {
            self.nodes.get_mut(next)?.previous_sibling = previous;
        }

        let record = self.nodes.get_mut(node)?;
        record.parent = None;
        record.previous_sibling = None;
        record.next_sibling = None;
        Ok(())
    }

    /// Inserts a detached `child` at the head of `parent`'s child list.
    fn link_first_child(&mut self, parent: NodeId, child: NodeId) -> ForestResult<()> {
        let old_first = self.nodes.get(parent)?.first_child;
        if let Some(old_first) = old_first {
            self.nodes.get_mut(old_first)?.previous_sibling = Some(child);
        }
        {
            let record = self.nodes.get_mut(child)?;
            record.parent = Some(parent);
            record.next_sibling = old_first;
            record.previous_sibling = None;
        }
        self.nodes.get_mut(parent)?.first_child = Some(child);
        self.roots.remove(&child);
        Ok(())
    }

    fn set_subtree_level(&mut self, node: NodeId, base: Level) -> ForestResult<()> {
        let mut stack = vec![(node, base)];
        while let Some((id, level)) = stack.pop() {
            let mut child = {
                let record = self.nodes.get_mut(id)?;
                record.level = level;
                record.first_child
            };
            while let Some(c) = child {
                stack.push((c, level + 1));
                child = self.nodes.get(c)?.next_sibling;
            }
        }
        Ok(())
    }

    fn post_order(&self, node: NodeId) -> ForestResult<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut stack = vec![(node, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                out.push(id);
                continue;
            }
            stack.push((id, true));
            let children = self.children_of(id)?;
            stack.extend(children.into_iter().rev().map(|child| (child, false)));
        }
        Ok(out)
    }
}

fn corrupted(node: NodeId, reason: impl Into<String>) -> ForestError {
    ForestError::Corrupted {
        node,
        reason: reason.into(),
    }
}

/// Iterator over a node's children, following `next_sibling` links.
pub struct Children<'a> {
    forest: &'a Forest,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self
            .forest
            .nodes
            .get(current)
            .ok()
            .and_then(|record| record.next_sibling);
        Some(current)
    }
}
