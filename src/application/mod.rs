//! Application layer: action log, replay and the hierarchy service
//!
//! This layer orchestrates the forest and depends on I/O boundary traits.

pub mod action_log;
pub mod error;
pub mod error_ext;
pub mod replay;
pub mod services;

pub use action_log::{parse_log, Action, ActionLog, ParseActionError};
pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
pub use replay::{apply, replay, ReplayReport};
