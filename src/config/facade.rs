//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::RegistryConfig;
use crate::error::Result;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the global file and environment.
    pub fn load() -> Result<RegistryConfig> {
        Ok(MergeService::load(None)?)
    }

    /// Load configuration with `path` layered over the global file.
    pub fn load_from_file(path: &Path) -> Result<RegistryConfig> {
        Ok(MergeService::load(Some(path))?)
    }

    /// Create default configuration.
    pub fn default() -> RegistryConfig {
        RegistryConfig::default()
    }
}
