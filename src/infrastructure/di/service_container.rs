//! Service container for dependency injection
//!
//! Wires up the hierarchy service with its dependencies.

use std::sync::Arc;

use crate::application::action_log::ActionLog;
use crate::application::services::HierarchyService;
use crate::config::Settings;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

/// Container holding settings and I/O implementations.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            settings: Arc::new(settings),
            fs,
        }
    }

    /// Action log at the configured path.
    pub fn action_log(&self) -> ActionLog {
        ActionLog::new(self.settings.log_file.clone(), Arc::clone(&self.fs))
    }

    /// Service that records to the configured action log.
    pub fn logging_service(&self) -> HierarchyService {
        HierarchyService::new(Some(self.action_log()))
    }

    /// Service that records nothing, used to replay logs read-only.
    pub fn scratch_service(&self) -> HierarchyService {
        HierarchyService::new(None)
    }

    /// Borrow the filesystem for one-off reads.
    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }
}
