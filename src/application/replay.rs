//! Re-executes logged actions against a forest.

use tracing::{debug, info, instrument};

use crate::application::action_log::Action;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{Forest, ForestResult, NodeId};

/// Summary of a replay run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Number of actions executed
    pub applied: usize,
    /// Handles allocated during replay, in order
    pub allocated: Vec<NodeId>,
    /// Number of nodes freed by remove actions
    pub removed: usize,
    /// Allocations whose replayed id differs from the logged one
    pub diverged: usize,
}

/// Applies one action. Returns the handle allocated by opcodes 1 and 2.
///
/// The id logged for an allocation is not forced; the forest hands out
/// whatever its free list and slot count dictate.
pub fn apply(forest: &mut Forest, action: &Action) -> ForestResult<Option<NodeId>> {
    match *action {
        Action::Allocate { .. } => Ok(Some(forest.allocate())),
        Action::AllocateChild { parent, .. } => forest.allocate_as_child(parent).map(Some),
        Action::Move { node, new_parent } => forest.move_node(node, new_parent).map(|_| None),
        Action::Remove { node } => forest.remove(node).map(|_| None),
    }
}

/// Replays `actions` in order, stopping at the first failing one.
///
/// Actions before the failure stay applied.
#[instrument(level = "debug", skip(forest, actions), fields(count = actions.len()))]
pub fn replay(forest: &mut Forest, actions: &[(usize, Action)]) -> ApplicationResult<ReplayReport> {
    let mut report = ReplayReport::default();

    for &(line, action) in actions {
        if let Action::Remove { node } = action {
            report.removed += forest.subtree(node).map(|s| s.len()).unwrap_or(0);
        }
        let allocated =
            apply(forest, &action).map_err(|source| ApplicationError::Replay { line, source })?;

        if let Some(id) = allocated {
            let logged = match action {
                Action::Allocate { id } => id,
                Action::AllocateChild { child, .. } => child,
                _ => id,
            };
            if logged != id {
                debug!("line {}: logged id {} replayed as {}", line, logged, id);
                report.diverged += 1;
            }
            report.allocated.push(id);
        }
        report.applied += 1;
    }

    info!(
        "replayed {} actions ({} allocated, {} removed)",
        report.applied,
        report.allocated.len(),
        report.removed
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::parse_log;
    use crate::domain::ForestError;

    #[test]
    fn given_fresh_forest_when_replaying_log_then_rebuilds_structure() {
        let actions = parse_log("1 0\n2 0 1\n2 0 2\n1 3\n3 1 3\n").unwrap();
        let mut forest = Forest::new();

        let report = replay(&mut forest, &actions).unwrap();

        assert_eq!(report.applied, 5);
        assert_eq!(report.diverged, 0);
        assert_eq!(forest.roots(), vec![NodeId::new(0), NodeId::new(3)]);
        assert_eq!(forest.children_of(NodeId::new(3)).unwrap(), vec![NodeId::new(1)]);
        assert_eq!(forest.level_of(NodeId::new(1)).unwrap(), 1);
    }

    #[test]
    fn given_existing_forest_when_replaying_then_ids_diverge() {
        let actions = parse_log("1 0\n2 0 1\n").unwrap();
        let mut forest = Forest::new();
        forest.allocate();

        let report = replay(&mut forest, &actions).unwrap();

        assert_eq!(report.allocated, vec![NodeId::new(1), NodeId::new(2)]);
        assert_eq!(report.diverged, 2);
    }

    #[test]
    fn given_failing_action_when_replaying_then_stops_with_line_number() {
        let actions = parse_log("1 0\n2 0 1\n3 0 1\n1 9\n").unwrap();
        let mut forest = Forest::new();

        let err = replay(&mut forest, &actions).unwrap_err();

        match err {
            ApplicationError::Replay { line, source } => {
                assert_eq!(line, 3);
                assert!(matches!(source, ForestError::CycleDetected { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(forest.len(), 2);
    }

    #[test]
    fn given_remove_action_when_replaying_then_counts_subtree() {
        let actions = parse_log("1 0\n2 0 1\n2 1 2\n4 0\n1 0\n").unwrap();
        let mut forest = Forest::new();

        let report = replay(&mut forest, &actions).unwrap();

        assert_eq!(report.removed, 3);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest.roots(), vec![NodeId::new(0)]);
    }
}
