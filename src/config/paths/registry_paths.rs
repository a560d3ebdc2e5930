//! Effective registry storage locations.

use crate::config::RegistryConfig;
use crate::store::file_set::{reroot, RegistryFiles};
use std::path::PathBuf;

/// Registry file set and package database directory after `alternate_root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub files: RegistryFiles,
    pub package_db_dir: PathBuf,
}

pub(crate) fn resolve(config: &RegistryConfig) -> ResolvedPaths {
    let mut files = RegistryFiles::new(&config.registry_dir).with_file_mode(config.file_mode);
    files.set_alternate_root(config.alternate_root.as_deref());
    let package_db_dir = match &config.alternate_root {
        Some(root) => reroot(root, &config.package_db_dir),
        None => config.package_db_dir.clone(),
    };
    ResolvedPaths {
        files,
        package_db_dir,
    }
}
