//! Command dispatch for the CLI.

use std::io;
use std::path::Path;

use clap::CommandFactory;
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::application::{ActionLog, ApplicationError};
use crate::cli::args::{Cli, Commands};
use crate::cli::error::CliResult;
use crate::cli::output;
use crate::cli::shell::Shell;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{format_entry, NodeEntry, ToTermTree};
use crate::infrastructure::di::ServiceContainer;

pub fn execute_command(cli: &Cli, settings: Settings) -> CliResult<()> {
    match &cli.command {
        None => _shell(settings, false),
        Some(Commands::Shell { no_tree }) => _shell(settings, *no_tree),
        Some(Commands::Replay { file, dump, toml }) => _replay(settings, file, *dump, *toml),
        Some(Commands::Check { file }) => _check(settings, file),
        Some(Commands::Config) => _config(&settings),
        Some(Commands::Completion { shell }) => _completion(*shell),
    }
}

#[instrument(skip(settings))]
fn _shell(mut settings: Settings, no_tree: bool) -> CliResult<()> {
    if no_tree {
        settings.show_tree = false;
    }
    let container = ServiceContainer::new(settings);
    debug!("logging actions to {}", container.settings.log_file.display());

    output::header("hierarchy shell (type `help` for commands)");
    let mut shell = Shell::new(container.logging_service(), container.fs(), &container.settings);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    shell.run(stdin.lock(), &mut stdout)
}

#[derive(Serialize)]
struct NodeDump<'a> {
    nodes: &'a [NodeEntry],
}

#[instrument(skip(settings))]
fn _replay(settings: Settings, file: &Path, dump: bool, toml: bool) -> CliResult<()> {
    let container = ServiceContainer::new(settings);
    let mut service = container.scratch_service();
    let report = service.replay_file(container.fs(), file)?;
    let forest = service.forest();

    if toml {
        let entries = forest.serialize();
        let rendered = toml::to_string_pretty(&NodeDump { nodes: &entries }).map_err(|e| {
            ApplicationError::OperationFailed {
                context: "render node dump as TOML".into(),
                source: Box::new(e),
            }
        })?;
        output::info(&rendered);
    } else if dump {
        for entry in forest.serialize() {
            output::info(&format_entry(&entry));
        }
    } else {
        print!("{}", forest.render());
    }

    output::success(&format!(
        "replayed {} actions: {} nodes live, {} freed handles",
        report.applied,
        forest.len(),
        forest.free_handles().len()
    ));
    if report.diverged > 0 {
        output::warning(&format!(
            "{} allocation(s) received different ids than logged",
            report.diverged
        ));
    }
    Ok(())
}

#[instrument(skip(settings))]
fn _check(settings: Settings, file: &Path) -> CliResult<()> {
    let container = ServiceContainer::new(settings);
    let actions = ActionLog::read_from(container.fs(), file)?;

    output::success(&format!("{}: {} actions parse", file.display(), actions.len()));
    let counts = actions.iter().counts_by(|(_, action)| action.opcode());
    for (opcode, count) in counts.into_iter().sorted() {
        output::detail(&format!("opcode {}: {}", opcode, count));
    }
    Ok(())
}

fn _config(settings: &Settings) -> CliResult<()> {
    output::header("Config files");
    match global_config_path() {
        Some(path) if path.exists() => output::success(&path.display()),
        Some(path) => output::failure(&format!("{} (not found)", path.display())),
        None => output::failure(&"global config directory unavailable"),
    }
    if let Ok(cwd) = std::env::current_dir() {
        let local = local_config_path(&cwd);
        if local.exists() {
            output::success(&local.display());
        } else {
            output::failure(&format!("{} (not found)", local.display()));
        }
    }

    output::header("Effective settings");
    output::info(&settings.to_toml()?);
    Ok(())
}

fn _completion(shell: clap_complete::Shell) -> CliResult<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}
