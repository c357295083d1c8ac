//! Integration tests for Settings loading with layered precedence.
//!
//! These tests run with temp directories only. They assume no global config
//! and no HIERARCHY_* variables in the environment.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use hierarchy::application::ApplicationError;
use hierarchy::config::{local_config_path, Settings};

#[test]
fn given_no_config_files_when_load_then_returns_defaults() {
    let dir = TempDir::new().unwrap();

    let settings = Settings::load(Some(dir.path())).expect("load settings");

    assert_eq!(settings, Settings::default());
}

#[test]
fn given_local_config_when_load_then_overrides_only_given_fields() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let local = r#"
log_file = "/var/tmp/forest.log"
show_tree = false
"#;
    fs::write(local_config_path(dir.path()), local).unwrap();

    // Act
    let settings = Settings::load(Some(dir.path())).expect("load settings");

    // Assert
    assert_eq!(settings.log_file, PathBuf::from("/var/tmp/forest.log"));
    assert!(!settings.show_tree);
    assert!(settings.color);
    assert_eq!(settings.prompt, "hierarchy>");
}

#[test]
fn given_malformed_local_config_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "show_tree = \"maybe\"\n").unwrap();

    let err = Settings::load(Some(dir.path())).unwrap_err();

    assert!(matches!(err, ApplicationError::Config { .. }));
    assert!(err.to_string().contains(".hierarchy.toml"));
}

#[test]
fn given_loaded_settings_when_rendering_toml_then_round_trips() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "prompt = \"forest$\"\n").unwrap();
    let settings = Settings::load(Some(dir.path())).unwrap();

    let rendered = settings.to_toml().unwrap();
    let parsed: Settings = toml::from_str(&rendered).unwrap();

    assert_eq!(parsed, settings);
    assert_eq!(parsed.prompt, "forest$");
}
