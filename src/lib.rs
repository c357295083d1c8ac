//! Arena-backed forest of multi-way trees.
//!
//! Nodes live in a single arena and are addressed by [`domain::NodeId`]
//! handles. Freed handles are reused last-in first-out. Every structural
//! change made through the shell is appended to an action log that can be
//! replayed into a fresh forest.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
