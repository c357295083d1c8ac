//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::application::action_log::{Action, ParseActionError};
use crate::domain::ForestError;

/// Application errors wrap forest errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Forest(#[from] ForestError),

    #[error("action log line {line}: {source}")]
    LogParse {
        line: usize,
        #[source]
        source: ParseActionError,
    },

    #[error("replay stopped at line {line}: {source}")]
    Replay {
        line: usize,
        #[source]
        source: ForestError,
    },

    #[error("`{action}` was applied but not written to the action log: {source}")]
    LogWrite {
        action: Action,
        #[source]
        source: Box<ApplicationError>,
    },

    #[error("action log not found: {0}")]
    LogNotFound(PathBuf),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
