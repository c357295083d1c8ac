//! Integration tests for the interactive shell, driven by scripted input.

use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use hierarchy::application::services::HierarchyService;
use hierarchy::application::ActionLog;
use hierarchy::cli::Shell;
use hierarchy::config::Settings;
use hierarchy::domain::NodeId;
use hierarchy::infrastructure::traits::{FileSystem, RealFileSystem};
use hierarchy::util::testing;

struct Session {
    _temp: TempDir,
    log_file: PathBuf,
    settings: Settings,
}

impl Session {
    /// Runs `script` in a fresh shell and returns the service and everything printed.
    fn run(&self, script: &str) -> (HierarchyService, String) {
        let fs = RealFileSystem;
        let service = HierarchyService::new(Some(ActionLog::new(&self.log_file, Arc::new(RealFileSystem))));
        let mut shell = Shell::new(service, &fs, &self.settings);
        let mut out = Vec::new();

        shell.run(Cursor::new(script.to_string()), &mut out).unwrap();

        (shell.into_service(), String::from_utf8(out).unwrap())
    }
}

#[fixture]
fn session() -> Session {
    testing::init_test_setup();
    let temp = TempDir::new().unwrap();
    let log_file = temp.path().join("action_log.txt");
    let settings = Settings {
        log_file: log_file.clone(),
        show_tree: false,
        color: false,
        prompt: ">".into(),
    };
    Session {
        _temp: temp,
        log_file,
        settings,
    }
}

#[rstest]
fn given_menu_script_when_running_then_reports_each_result(session: Session) {
    let (service, out) = session.run("1\n2 0\n2 0\n7 0\n5 2\n6 2\n6 0\n9\n");

    assert!(out.contains("Added node with ID: 0\n"));
    assert!(out.contains("Added node with ID: 1 as a child of node 0\n"));
    assert!(out.contains("Added node with ID: 2 as a child of node 0\n"));
    assert!(out.contains("Children of node 0: 2 1\n"));
    assert!(out.contains("Node 2 is at level 1\n"));
    assert!(out.contains("Parent of node 2 is node 0\n"));
    assert!(out.contains("Node 0 does not have a parent.\n"));
    assert_eq!(service.forest().len(), 3);
}

#[rstest]
fn given_mutations_when_running_then_action_log_is_written(session: Session) {
    session.run("add\nadd-child 0\nadd\nmove 1 2\nremove 2\nexit\n");

    assert_eq!(
        fs::read_to_string(&session.log_file).unwrap(),
        "1 0\n2 0 1\n1 2\n3 1 2\n4 2\n"
    );
}

#[rstest]
fn given_errors_when_running_then_loop_continues(session: Session) {
    let (service, out) = session.run("add\nmove 0 0\nlevel 9\nfrobnicate\nremove x\nadd\n");

    assert_eq!(out.matches("error").count(), 4);
    assert!(out.contains("cycle"));
    assert!(out.contains("Added node with ID: 1\n"));
    assert_eq!(service.forest().roots(), vec![NodeId::new(0), NodeId::new(1)]);
}

#[rstest]
fn given_orphan_when_running_then_level_stays_until_relevel(session: Session) {
    let (service, out) = session.run("add\nadd-child 0\norphan 1\nlevel 1\norphan 1\nrelevel 1\nlevel 1\n");

    assert!(out.contains("Node 1 is at level 1\n"));
    assert!(out.contains("already an orphan"));
    assert!(out.contains("Node 1 is at level 0\n"));
    assert_eq!(service.forest().parent_of(NodeId::new(1)).unwrap(), None);
}

#[rstest]
fn given_recorded_log_when_replaying_in_shell_then_rebuilds_forest(session: Session) {
    let replay_source = session._temp.path().join("recorded.txt");
    fs::write(&replay_source, "1 0\n2 0 1\n2 1 2\n").unwrap();
    let script = format!("replay {}\nroots\ndump\ncheck\n", replay_source.display());

    let (service, out) = session.run(&script);

    assert!(out.contains("Replayed 3 actions"));
    assert!(out.contains("Roots: 0\n"));
    assert!(out.contains("Forest is consistent (3 nodes)"));
    assert_eq!(service.forest().level_of(NodeId::new(2)).unwrap(), 2);
    assert!(!session.log_file.exists());
}

#[rstest]
fn given_show_tree_when_mutating_then_prints_forest(mut session: Session) {
    session.settings.show_tree = true;

    let (_, out) = session.run("add\nadd-child 0\n");

    assert!(out.contains("#0 (level 0)"));
    assert!(out.contains("#1 (level 1)"));
}

#[rstest]
fn given_end_of_input_without_exit_when_running_then_returns(session: Session) {
    let (service, out) = session.run("");

    assert!(service.forest().is_empty());
    assert!(out.starts_with(">"));
}

struct ReadOnlyLog;

impl FileSystem for ReadOnlyLog {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn append_line(&self, _path: &Path, _line: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[rstest]
fn given_unwritable_log_when_adding_then_reports_node_and_warns(session: Session) {
    let fs = RealFileSystem;
    let service = HierarchyService::new(Some(ActionLog::new(&session.log_file, Arc::new(ReadOnlyLog))));
    let mut shell = Shell::new(service, &fs, &session.settings);
    let mut out = Vec::new();

    shell.run(Cursor::new("add\nadd-child 0\n".to_string()), &mut out).unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Added node with ID: 0\n"));
    assert!(out.contains("Added node with ID: 1 as a child of node 0\n"));
    assert_eq!(out.matches("not written to the action log").count(), 2);
    assert!(!out.contains("error:"));
    assert_eq!(shell.into_service().forest().len(), 2);
}
