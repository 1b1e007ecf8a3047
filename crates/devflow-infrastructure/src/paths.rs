//! Unified path management for devflow configuration files.
//!
//! Path resolution lives here so the storage layer and the migration engine
//! only ever receive ready-made paths.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable overriding the global configuration directory.
pub const CONFIG_DIR_ENV: &str = "DEVFLOW_CONFIG_DIR";

/// File name of the per-repository configuration document.
pub const PROJECT_CONFIG_FILE: &str = ".devflow.toml";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform config directory could not be determined.
    ConfigDirNotFound,
    /// No repository root above the given directory.
    ProjectRootNotFound(PathBuf),
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find the configuration directory"),
            PathError::ProjectRootNotFound(start) => write!(
                f,
                "No git repository found at or above {}",
                start.display()
            ),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for devflow_core::DevflowError {
    fn from(err: PathError) -> Self {
        devflow_core::DevflowError::config(err.to_string())
    }
}

/// Unified path management for devflow.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/devflow/           # Config directory ($DEVFLOW_CONFIG_DIR overrides)
/// └── config.toml              # Global configuration document
///
/// <repository>/
/// └── .devflow.toml            # Project configuration document
/// ```
pub struct DevflowPaths;

impl DevflowPaths {
    /// Returns the devflow configuration directory.
    pub fn config_dir() -> Result<PathBuf, PathError> {
        Self::resolve_config_dir(std::env::var_os(CONFIG_DIR_ENV), dirs::config_dir())
    }

    /// Returns the path to the global configuration document.
    pub fn global_config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Finds the repository root at or above `start`.
    ///
    /// A directory counts as a root when it contains a `.git` entry (a
    /// directory for normal clones, a file for worktrees and submodules).
    pub fn find_project_root(start: &Path) -> Result<PathBuf, PathError> {
        start
            .ancestors()
            .find(|dir| dir.join(".git").exists())
            .map(Path::to_path_buf)
            .ok_or_else(|| PathError::ProjectRootNotFound(start.to_path_buf()))
    }

    /// Returns the project configuration document inside `root`.
    pub fn project_config_file(root: &Path) -> PathBuf {
        root.join(PROJECT_CONFIG_FILE)
    }

    fn resolve_config_dir(
        override_dir: Option<OsString>,
        platform_dir: Option<PathBuf>,
    ) -> Result<PathBuf, PathError> {
        if let Some(dir) = override_dir.filter(|d| !d.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        platform_dir
            .map(|dir| dir.join("devflow"))
            .ok_or(PathError::ConfigDirNotFound)
    }
}
