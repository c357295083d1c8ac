//! I/O boundary traits for testability
//!
//! The action log only ever reads whole files and appends lines, so that is
//! all the boundary exposes.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Append `line` plus a newline, creating the file if needed.
    fn append_line(&self, path: &Path, line: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;
}

/// Real filesystem implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn append_line(&self, path: &Path, line: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", line)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn given_missing_file_when_appending_then_creates_and_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("action_log.txt");
        let fs = RealFileSystem;

        fs.append_line(&path, "1 0").unwrap();
        fs.append_line(&path, "2 0 1").unwrap();

        assert!(fs.exists(&path));
        assert_eq!(fs.read_to_string(&path).unwrap(), "1 0\n2 0 1\n");
    }
}
