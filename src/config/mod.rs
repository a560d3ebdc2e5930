//! Configuration
//!
//! Where the registry file set and the package database live, and how the
//! crate logs. Values come from built-in defaults, an optional global file,
//! an optional explicit file, and `PRODREG_*` environment variables.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;

pub use facade::ConfigLoader;
pub use paths::registry_paths::ResolvedPaths;

use crate::logging::LoggingConfig;
use crate::store::file_set::{DEFAULT_FILE_MODE, DEFAULT_REGISTRY_DIR};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default package metadata root of the host package system.
pub const DEFAULT_PACKAGE_DB_DIR: &str = "/var/sadm/pkg";

/// Default release naming the system software root of the overlay.
pub const DEFAULT_RELEASE: &str = "5.10";

fn default_registry_dir() -> PathBuf {
    PathBuf::from(DEFAULT_REGISTRY_DIR)
}

fn default_package_db_dir() -> PathBuf {
    PathBuf::from(DEFAULT_PACKAGE_DB_DIR)
}

fn default_release() -> String {
    DEFAULT_RELEASE.to_string()
}

fn default_file_mode() -> u32 {
    DEFAULT_FILE_MODE
}

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistryConfig {
    /// Directory holding productregistry, .bak and .new
    #[serde(default = "default_registry_dir")]
    pub registry_dir: PathBuf,

    /// Root of an alternate image the registry and package database live under
    #[serde(default)]
    pub alternate_root: Option<PathBuf>,

    /// Per-package metadata root (one directory per package with a pkginfo file)
    #[serde(default = "default_package_db_dir")]
    pub package_db_dir: PathBuf,

    /// OS release used to name the system software root
    #[serde(default = "default_release")]
    pub release: String,

    /// Permission bits of committed registry files
    #[serde(default = "default_file_mode")]
    pub file_mode: u32,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_dir: default_registry_dir(),
            alternate_root: None,
            package_db_dir: default_package_db_dir(),
            release: default_release(),
            file_mode: default_file_mode(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RegistryConfig {
    /// Effective file set and package database directory, with
    /// `alternate_root` applied to both.
    pub fn resolve_paths(&self) -> ResolvedPaths {
        paths::registry_paths::resolve(self)
    }
}
