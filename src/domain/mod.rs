//! Domain layer: the forest and its arena
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod display;
pub mod error;
pub mod forest;

pub use arena::{Arena, Handle, NodeId, Slot};
pub use display::{format_entry, ToTermTree};
pub use error::{ForestError, ForestResult};
pub use forest::{Children, Forest, Level, NodeEntry, OrphanOutcome};
