//! Append-only action log.
//!
//! One action per line, whitespace separated:
//!
//! | line            | action                                   |
//! |-----------------|------------------------------------------|
//! | `1 <id>`        | allocate a root (id kept for audit only) |
//! | `2 <parent> <id>` | allocate a child of `<parent>`         |
//! | `3 <node> <parent>` | move `<node>` under `<parent>`       |
//! | `4 <node>`      | remove `<node>` and its subtree          |
//!
//! Logged ids are what the recording session saw. Replay re-derives allocated ids
//! from the forest it runs against, so they may differ.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::NodeId;
use crate::infrastructure::traits::FileSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Allocate { id: NodeId },
    AllocateChild { parent: NodeId, child: NodeId },
    Move { node: NodeId, new_parent: NodeId },
    Remove { node: NodeId },
}

impl Action {
    pub fn opcode(&self) -> u8 {
        match self {
            Action::Allocate { .. } => 1,
            Action::AllocateChild { .. } => 2,
            Action::Move { .. } => 3,
            Action::Remove { .. } => 4,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Allocate { id } => write!(f, "1 {}", id),
            Action::AllocateChild { parent, child } => write!(f, "2 {} {}", parent, child),
            Action::Move { node, new_parent } => write!(f, "3 {} {}", node, new_parent),
            Action::Remove { node } => write!(f, "4 {}", node),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseActionError {
    #[error("empty line")]
    Empty,

    #[error("unknown opcode `{0}`")]
    UnknownOpcode(String),

    #[error("opcode {opcode} expects {expected} field(s), found {found}")]
    FieldCount {
        opcode: u8,
        expected: usize,
        found: usize,
    },

    #[error("invalid node id `{0}`")]
    InvalidId(String),
}

impl FromStr for Action {
    type Err = ParseActionError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut fields = line.split_whitespace();
        let (opcode, expected) = match fields.next().ok_or(ParseActionError::Empty)? {
            "1" => (1, 1),
            "2" => (2, 2),
            "3" => (3, 2),
            "4" => (4, 1),
            other => return Err(ParseActionError::UnknownOpcode(other.to_string())),
        };
        let ids = fields.map(parse_id).collect::<Result<Vec<_>, _>>()?;

        match (opcode, ids.as_slice()) {
            (1, &[id]) => Ok(Action::Allocate { id }),
            (2, &[parent, child]) => Ok(Action::AllocateChild { parent, child }),
            (3, &[node, new_parent]) => Ok(Action::Move { node, new_parent }),
            (4, &[node]) => Ok(Action::Remove { node }),
            _ => Err(ParseActionError::FieldCount {
                opcode,
                expected,
                found: ids.len(),
            }),
        }
    }
}

fn parse_id(field: &str) -> Result<NodeId, ParseActionError> {
    field
        .parse::<u32>()
        .map(NodeId::new)
        .map_err(|_| ParseActionError::InvalidId(field.to_string()))
}

/// Parses a whole log, skipping blank lines. Each action is paired with its
/// 1-based line number.
pub fn parse_log(content: &str) -> ApplicationResult<Vec<(usize, Action)>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            line.parse::<Action>()
                .map(|action| (index + 1, action))
                .map_err(|source| ApplicationError::LogParse {
                    line: index + 1,
                    source,
                })
        })
        .collect()
}

/// Action log file accessed through the [`FileSystem`] boundary.
#[derive(Clone)]
pub struct ActionLog {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for ActionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionLog").field("path", &self.path).finish()
    }
}

impl ActionLog {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[instrument(level = "debug", skip(self))]
    pub fn append(&self, action: &Action) -> ApplicationResult<()> {
        self.fs
            .append_line(&self.path, &action.to_string())
            .with_path_context("append to action log", &self.path)?;
        debug!("logged `{}`", action);
        Ok(())
    }

    /// Reads and parses the log at this log's path.
    pub fn read(&self) -> ApplicationResult<Vec<(usize, Action)>> {
        Self::read_from(self.fs.as_ref(), &self.path)
    }

    /// Reads and parses any log file.
    #[instrument(level = "debug", skip(fs))]
    pub fn read_from(fs: &dyn FileSystem, path: &Path) -> ApplicationResult<Vec<(usize, Action)>> {
        if !fs.exists(path) {
            return Err(ApplicationError::LogNotFound(path.to_path_buf()));
        }
        let content = fs
            .read_to_string(path)
            .with_path_context("read action log", path)?;
        parse_log(&content)
    }
}
