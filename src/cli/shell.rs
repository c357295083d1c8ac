//! Interactive command loop.
//!
//! Reads one command per line, executes it against the hierarchy service and
//! writes human readable results. Errors are reported and the loop carries
//! on. The numeric options of the classic menu (`1`..`9`) are accepted as
//! aliases, with their arguments on the same line.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;

use colored::Colorize;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::services::HierarchyService;
use crate::cli::error::{CliError, CliResult};
use crate::config::Settings;
use crate::domain::{format_entry, NodeId, OrphanOutcome, ToTermTree};
use crate::infrastructure::traits::FileSystem;
use crate::infrastructure::InfraError;

const HELP: &str = "\
commands:
  add                     (1) add a root node
  add-child <parent>      (2) add a node under <parent>
  move <node> <parent>    (3) move <node> under <parent>
  remove <node>           (4) remove <node> and its subtree
  level <node>            (5) show the level of <node>
  parent <node>           (6) show the parent of <node>
  children <node>         (7) list the children of <node>
  replay [file]           (8) replay an action log into this forest
  exit | quit             (9) leave the shell
  orphan <node>           detach <node> into a root (levels are not recomputed)
  relevel <node>          recompute levels below <node>
  roots                   list root nodes
  show                    print the forest
  dump                    print every node with its links
  check                   verify structural invariants and levels
  help                    this text";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Add,
    AddChild(NodeId),
    Move { node: NodeId, new_parent: NodeId },
    Remove(NodeId),
    Level(NodeId),
    Parent(NodeId),
    Children(NodeId),
    Replay(Option<PathBuf>),
    Exit,
    Orphan(NodeId),
    Relevel(NodeId),
    Roots,
    Show,
    Dump,
    Check,
    Help,
}

impl ShellCommand {
    /// Whether the command can change the forest.
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            ShellCommand::Add
                | ShellCommand::AddChild(_)
                | ShellCommand::Move { .. }
                | ShellCommand::Remove(_)
                | ShellCommand::Replay(_)
                | ShellCommand::Orphan(_)
                | ShellCommand::Relevel(_)
        )
    }
}

impl FromStr for ShellCommand {
    type Err = CliError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(CliError::Usage("empty command".into()));
        };
        let args: Vec<&str> = words.collect();

        let command = match verb {
            "1" | "add" => {
                expect_args(verb, &args, 0)?;
                ShellCommand::Add
            }
            "2" | "add-child" => ShellCommand::AddChild(single_id(verb, &args)?),
            "3" | "move" => {
                expect_args(verb, &args, 2)?;
                ShellCommand::Move {
                    node: parse_id(args[0])?,
                    new_parent: parse_id(args[1])?,
                }
            }
            "4" | "remove" => ShellCommand::Remove(single_id(verb, &args)?),
            "5" | "level" => ShellCommand::Level(single_id(verb, &args)?),
            "6" | "parent" => ShellCommand::Parent(single_id(verb, &args)?),
            "7" | "children" => ShellCommand::Children(single_id(verb, &args)?),
            "8" | "replay" => match args.as_slice() {
                [] => ShellCommand::Replay(None),
                [file] => ShellCommand::Replay(Some(PathBuf::from(file))),
                _ => return Err(CliError::Usage("usage: replay [file]".into())),
            },
            "9" | "exit" | "quit" => ShellCommand::Exit,
            "orphan" => ShellCommand::Orphan(single_id(verb, &args)?),
            "relevel" => ShellCommand::Relevel(single_id(verb, &args)?),
            "roots" => ShellCommand::Roots,
            "show" => ShellCommand::Show,
            "dump" => ShellCommand::Dump,
            "check" => ShellCommand::Check,
            "help" | "?" => ShellCommand::Help,
            other => {
                return Err(CliError::Usage(format!(
                    "unknown command `{}` (try `help`)",
                    other
                )))
            }
        };
        Ok(command)
    }
}

fn expect_args(verb: &str, args: &[&str], count: usize) -> CliResult<()> {
    if args.len() != count {
        return Err(CliError::Usage(format!(
            "`{}` takes {} argument(s), got {}",
            verb,
            count,
            args.len()
        )));
    }
    Ok(())
}

fn single_id(verb: &str, args: &[&str]) -> CliResult<NodeId> {
    expect_args(verb, args, 1)?;
    parse_id(args[0])
}

fn parse_id(word: &str) -> CliResult<NodeId> {
    word.parse::<u32>()
        .map(NodeId::new)
        .map_err(|_| CliError::InvalidArgs(format!("`{}` is not a node id", word)))
}

enum Flow {
    Continue,
    Exit,
}

/// Interactive shell over a [`HierarchyService`].
pub struct Shell<'a> {
    service: HierarchyService,
    fs: &'a dyn FileSystem,
    settings: &'a Settings,
}

impl<'a> Shell<'a> {
    pub fn new(service: HierarchyService, fs: &'a dyn FileSystem, settings: &'a Settings) -> Self {
        Self {
            service,
            fs,
            settings,
        }
    }

    pub fn service(&self) -> &HierarchyService {
        &self.service
    }

    pub fn into_service(self) -> HierarchyService {
        self.service
    }

    /// Runs until `exit` or end of input.
    #[instrument(level = "debug", skip_all)]
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> CliResult<()> {
        let mut lines = input.lines();
        loop {
            write!(out, "{} ", self.settings.prompt).map_err(write_err)?;
            out.flush().map_err(write_err)?;

            let Some(line) = lines.next() else {
                writeln!(out).map_err(write_err)?;
                break;
            };
            let line = line.map_err(|e| InfraError::io("read shell input", e))?;
            if line.trim().is_empty() {
                continue;
            }

            let outcome = line
                .parse::<ShellCommand>()
                .and_then(|command| self.execute(&command, out).map(|flow| (command, flow)));
            match outcome {
                Ok((_, Flow::Exit)) => break,
                Ok((command, Flow::Continue)) => {
                    if let Some(e) = self.service.take_log_error() {
                        writeln!(out, "{}: {}", "Warning".yellow(), e).map_err(write_err)?;
                    }
                    if command.mutates() && self.settings.show_tree {
                        write!(out, "{}", self.service.forest().render()).map_err(write_err)?;
                    }
                }
                Err(CliError::Infra(InfraError::Io { context, source })) => {
                    return Err(InfraError::Io { context, source }.into());
                }
                Err(e) => {
                    debug!("command `{}` failed: {}", line.trim(), e);
                    writeln!(out, "{}: {}", "error".red().bold(), e).map_err(write_err)?;
                }
            }
        }
        Ok(())
    }

    fn execute<W: Write>(&mut self, command: &ShellCommand, out: &mut W) -> CliResult<Flow> {
        match command {
            ShellCommand::Add => {
                let id = self.service.add_root()?;
                writeln!(out, "Added node with ID: {}", id).map_err(write_err)?;
            }
            ShellCommand::AddChild(parent) => {
                let id = self.service.add_child(*parent)?;
                writeln!(out, "Added node with ID: {} as a child of node {}", id, parent)
                    .map_err(write_err)?;
            }
            ShellCommand::Move { node, new_parent } => {
                self.service.move_node(*node, *new_parent)?;
                writeln!(out, "Moved node {} under node {}", node, new_parent).map_err(write_err)?;
            }
            ShellCommand::Remove(node) => {
                let freed = self.service.remove(*node)?;
                writeln!(out, "Removed node {} ({} nodes freed)", node, freed.len())
                    .map_err(write_err)?;
            }
            ShellCommand::Level(node) => {
                let level = self.service.forest().level_of(*node).map_err(app_err)?;
                writeln!(out, "Node {} is at level {}", node, level).map_err(write_err)?;
            }
            ShellCommand::Parent(node) => match self.service.forest().parent_of(*node).map_err(app_err)? {
                Some(parent) => {
                    writeln!(out, "Parent of node {} is node {}", node, parent).map_err(write_err)?
                }
                None => writeln!(out, "Node {} does not have a parent.", node).map_err(write_err)?,
            },
            ShellCommand::Children(node) => {
                let children = self.service.forest().children_of(*node).map_err(app_err)?;
                writeln!(out, "Children of node {}: {}", node, children.iter().join(" "))
                    .map_err(write_err)?;
            }
            ShellCommand::Replay(file) => {
                let path = file.clone().unwrap_or_else(|| self.settings.log_file.clone());
                let report = self.service.replay_file(self.fs, &path)?;
                writeln!(out, "Replayed {} actions from {}", report.applied, path.display())
                    .map_err(write_err)?;
                if report.diverged > 0 {
                    writeln!(
                        out,
                        "{}: {} allocation(s) received different ids than logged",
                        "Warning".yellow(),
                        report.diverged
                    )
                    .map_err(write_err)?;
                }
            }
            ShellCommand::Exit => return Ok(Flow::Exit),
            ShellCommand::Orphan(node) => match self.service.orphan(*node)? {
                OrphanOutcome::Detached => writeln!(
                    out,
                    "Node {} is now a root (levels unchanged, run `relevel {}` to recompute)",
                    node, node
                )
                .map_err(write_err)?,
                OrphanOutcome::AlreadyRoot => {
                    writeln!(out, "{}: node {} is already an orphan", "Warning".yellow(), node)
                        .map_err(write_err)?
                }
            },
            ShellCommand::Relevel(node) => {
                self.service.relevel(*node)?;
                writeln!(out, "Recomputed levels below node {}", node).map_err(write_err)?;
            }
            ShellCommand::Roots => {
                let roots = self.service.forest().roots();
                writeln!(out, "Roots: {}", roots.iter().join(" ")).map_err(write_err)?;
            }
            ShellCommand::Show => {
                write!(out, "{}", self.service.forest().render()).map_err(write_err)?;
            }
            ShellCommand::Dump => {
                for entry in self.service.forest().serialize() {
                    writeln!(out, "{}", format_entry(&entry)).map_err(write_err)?;
                }
            }
            ShellCommand::Check => {
                let forest = self.service.forest();
                forest.check_invariants().map_err(app_err)?;
                match forest.check_levels() {
                    Ok(()) => writeln!(out, "Forest is consistent ({} nodes)", forest.len())
                        .map_err(write_err)?,
                    Err(e) => writeln!(out, "{}: structure is consistent but {}", "Warning".yellow(), e)
                        .map_err(write_err)?,
                }
            }
            ShellCommand::Help => writeln!(out, "{}", HELP).map_err(write_err)?,
        }
        Ok(Flow::Continue)
    }
}

fn write_err(e: std::io::Error) -> CliError {
    InfraError::io("write shell output", e).into()
}

fn app_err(e: crate::domain::ForestError) -> CliError {
    crate::application::ApplicationError::from(e).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn id(raw: u32) -> NodeId {
        NodeId::new(raw)
    }

    #[rstest]
    #[case("add", ShellCommand::Add)]
    #[case("1", ShellCommand::Add)]
    #[case("add-child 3", ShellCommand::AddChild(id(3)))]
    #[case("2 3", ShellCommand::AddChild(id(3)))]
    #[case("move 4 1", ShellCommand::Move { node: id(4), new_parent: id(1) })]
    #[case("3 4 1", ShellCommand::Move { node: id(4), new_parent: id(1) })]
    #[case("remove 2", ShellCommand::Remove(id(2)))]
    #[case("5 2", ShellCommand::Level(id(2)))]
    #[case("6 2", ShellCommand::Parent(id(2)))]
    #[case("7 2", ShellCommand::Children(id(2)))]
    #[case("8", ShellCommand::Replay(None))]
    #[case("replay other.txt", ShellCommand::Replay(Some(PathBuf::from("other.txt"))))]
    #[case("9", ShellCommand::Exit)]
    #[case("quit", ShellCommand::Exit)]
    #[case("orphan 5", ShellCommand::Orphan(id(5)))]
    #[case("relevel 5", ShellCommand::Relevel(id(5)))]
    #[case("  roots  ", ShellCommand::Roots)]
    fn given_command_line_when_parsing_then_returns_command(#[case] line: &str, #[case] expected: ShellCommand) {
        assert_eq!(line.parse::<ShellCommand>().unwrap(), expected);
    }

    #[rstest]
    #[case("frobnicate")]
    #[case("move 1")]
    #[case("add 1")]
    #[case("remove x")]
    #[case("remove -1")]
    #[case("replay a b")]
    fn given_bad_command_line_when_parsing_then_fails(#[case] line: &str) {
        assert!(line.parse::<ShellCommand>().is_err());
    }

    #[test]
    fn given_commands_when_classifying_then_only_changes_mutate() {
        assert!(ShellCommand::Add.mutates());
        assert!(ShellCommand::Orphan(id(0)).mutates());
        assert!(!ShellCommand::Roots.mutates());
        assert!(!ShellCommand::Dump.mutates());
    }
}
