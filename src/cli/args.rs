//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Arena-backed forest with reparenting, subtree removal and a replayable action log
#[derive(Parser, Debug)]
#[command(name = "hierarchy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Action log file (default from config: action_log.txt)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// Print author and version
    #[arg(long)]
    pub info: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive shell (default)
    Shell {
        /// Do not print the forest after each change
        #[arg(long)]
        no_tree: bool,
    },

    /// Replay an action log into a fresh forest and print it
    Replay {
        /// Action log to replay
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Print every node with its links instead of the tree
        #[arg(long)]
        dump: bool,
        /// Print the node dump as TOML
        #[arg(long, conflicts_with = "dump")]
        toml: bool,
    },

    /// Parse an action log without executing it
    Check {
        /// Action log to check
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Show effective settings
    Config,

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
