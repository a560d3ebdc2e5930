//! MergeService: orchestrates sources, applies merge policy, deserializes to RegistryConfig.

use super::builder_with_defaults;
use crate::config::sources::{environment, explicit_file, global_file};
use crate::config::RegistryConfig;
use config::ConfigError;
use std::path::Path;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Precedence: defaults (lowest) -> global file -> explicit file -> environment (highest).
    pub fn load(explicit: Option<&Path>) -> Result<RegistryConfig, ConfigError> {
        let builder = builder_with_defaults();
        let builder = global_file::add_to_builder(builder);
        let builder = match explicit {
            Some(path) => explicit_file::add_to_builder(builder, path),
            None => builder,
        };
        let builder = environment::add_to_builder(builder);

        let config = builder.build()?;
        let loaded: RegistryConfig = config.try_deserialize()?;
        tracing::debug!(
            registry_dir = %loaded.registry_dir.display(),
            package_db_dir = %loaded.package_db_dir.display(),
            "Loaded registry configuration"
        );
        Ok(loaded)
    }
}
