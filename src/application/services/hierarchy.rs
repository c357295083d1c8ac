//! Hierarchy service
//!
//! Owns the forest for a session and records every successful structural
//! change to the action log.

use std::path::Path;

use tracing::{debug, instrument, warn};

use crate::application::action_log::{Action, ActionLog};
use crate::application::replay::{replay, ReplayReport};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{Forest, NodeId, OrphanOutcome};
use crate::infrastructure::traits::FileSystem;

/// Service wrapping a [`Forest`] with an optional action log.
///
/// Only the four logged operations (allocate, allocate-as-child, move, remove)
/// are written to the log; `orphan` and `relevel` have no opcode.
///
/// A change that reached the forest is reported as a success even when the
/// log append fails. The failure is kept as [`ApplicationError::LogWrite`]
/// until [`HierarchyService::take_log_error`] collects it.
#[derive(Debug, Default)]
pub struct HierarchyService {
    forest: Forest,
    log: Option<ActionLog>,
    log_error: Option<ApplicationError>,
}

impl HierarchyService {
    pub fn new(log: Option<ActionLog>) -> Self {
        Self {
            forest: Forest::new(),
            log,
            log_error: None,
        }
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn log(&self) -> Option<&ActionLog> {
        self.log.as_ref()
    }

    #[instrument(level = "debug", skip(self))]
    pub fn add_root(&mut self) -> ApplicationResult<NodeId> {
        let id = self.forest.allocate();
        self.record(Action::Allocate { id });
        Ok(id)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn add_child(&mut self, parent: NodeId) -> ApplicationResult<NodeId> {
        let child = self.forest.allocate_as_child(parent)?;
        self.record(Action::AllocateChild { parent, child });
        Ok(child)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn move_node(&mut self, node: NodeId, new_parent: NodeId) -> ApplicationResult<()> {
        self.forest.move_node(node, new_parent)?;
        self.record(Action::Move { node, new_parent });
        Ok(())
    }

    /// Removes `node` and its subtree, returning the freed handles.
    #[instrument(level = "debug", skip(self))]
    pub fn remove(&mut self, node: NodeId) -> ApplicationResult<Vec<NodeId>> {
        let freed = self.forest.remove(node)?;
        self.record(Action::Remove { node });
        Ok(freed)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn orphan(&mut self, node: NodeId) -> ApplicationResult<OrphanOutcome> {
        Ok(self.forest.orphan(node)?)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn relevel(&mut self, node: NodeId) -> ApplicationResult<()> {
        Ok(self.forest.recompute_levels(node)?)
    }

    /// Replays a log file into the current forest. Replayed actions are not
    /// logged again.
    #[instrument(level = "debug", skip(self, fs))]
    pub fn replay_file(&mut self, fs: &dyn FileSystem, path: &Path) -> ApplicationResult<ReplayReport> {
        let actions = ActionLog::read_from(fs, path)?;
        debug!("replaying {} actions from {}", actions.len(), path.display());
        replay(&mut self.forest, &actions)
    }

    /// Most recent log append failure since the last call, if any.
    pub fn take_log_error(&mut self) -> Option<ApplicationError> {
        self.log_error.take()
    }

    fn record(&mut self, action: Action) {
        let Some(log) = &self.log else {
            return;
        };
        if let Err(source) = log.append(&action) {
            warn!("`{}` applied but not logged: {}", action, source);
            self.log_error = Some(ApplicationError::LogWrite {
                action,
                source: Box::new(source),
            });
        }
    }
}
