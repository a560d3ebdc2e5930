//! ProductRegistry: per-operation sessions over a configured file set.

use super::query::Query;
use super::session::RegistrySession;
use crate::component::{Component, ComponentRef};
use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::overlay::PackageOverlay;
use crate::store::file_set::reroot;
use crate::store::RegistryFiles;
use crate::types::{AccessMode, Instance};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Handle on one product registry and the package database beside it.
#[derive(Debug, Clone)]
pub struct ProductRegistry {
    files: RegistryFiles,
    package_db_dir: PathBuf,
    overlay: PackageOverlay,
}

impl ProductRegistry {
    pub fn new(config: &RegistryConfig) -> Self {
        let resolved = config.resolve_paths();
        Self {
            files: resolved.files,
            package_db_dir: config.package_db_dir.clone(),
            overlay: PackageOverlay::new(resolved.package_db_dir, &config.release),
        }
    }

    /// Registry in `files` with packages read from `package_db_dir`.
    pub fn with_paths(files: RegistryFiles, package_db_dir: impl Into<PathBuf>, release: &str) -> Self {
        let package_db_dir = package_db_dir.into();
        Self {
            files,
            overlay: PackageOverlay::new(package_db_dir.clone(), release),
            package_db_dir,
        }
    }

    pub fn files(&self) -> &RegistryFiles {
        &self.files
    }

    pub fn overlay(&self) -> &PackageOverlay {
        &self.overlay
    }

    /// Move the file set and package database under `root`, or back to their
    /// configured locations for `None`.
    pub fn set_alternate_root(&mut self, root: Option<&Path>) {
        self.files.set_alternate_root(root);
        let pkg_dir = match root {
            Some(root) => reroot(root, &self.package_db_dir),
            None => self.package_db_dir.clone(),
        };
        self.overlay.set_pkg_dir(pkg_dir);
        debug!(dir = %self.files.dir().display(), "Registry location changed");
    }

    /// Registry directory exists and is writable, and so is the current file
    /// when present.
    pub fn is_available(&self) -> bool {
        let dir_writable = std::fs::metadata(self.files.dir())
            .map(|meta| meta.is_dir() && !meta.permissions().readonly())
            .unwrap_or(false);
        if !dir_writable {
            return false;
        }
        match std::fs::symlink_metadata(self.files.current()) {
            Ok(_) => OpenOptions::new()
                .append(true)
                .open(self.files.current())
                .is_ok(),
            Err(_) => true,
        }
    }

    pub fn can_access(&self, mode: AccessMode) -> bool {
        match mode {
            AccessMode::ReadWrite => self.is_available(),
            AccessMode::Read => {
                if self.files.current().exists() {
                    std::fs::File::open(self.files.current()).is_ok()
                } else {
                    self.files.dir().is_dir()
                }
            }
        }
    }

    /// Start a session; the caller decides when to close it.
    pub fn open(&self, mode: AccessMode) -> Result<RegistrySession> {
        RegistrySession::open(self.files.clone(), mode)
    }

    fn read<T>(&self, f: impl FnOnce(&RegistrySession) -> T) -> Result<T> {
        let session = self.open(AccessMode::Read)?;
        let value = f(&session);
        session.close()?;
        Ok(value)
    }

    fn write<T>(&self, f: impl FnOnce(&mut RegistrySession) -> Result<T>) -> Result<T> {
        let mut session = self.open(AccessMode::ReadWrite)?;
        // Dropped uncommitted on error.
        let value = f(&mut session)?;
        session.close()?;
        Ok(value)
    }

    /// First component matching `query`.
    pub fn get(&self, query: &Query) -> Result<Component> {
        self.read(|session| session.get(query))?
            .ok_or_else(|| RegistryError::NotFound(format!("{:?}", query)))
    }

    pub fn query(&self, query: &Query) -> Result<Vec<Component>> {
        self.read(|session| session.query(query))
    }

    pub fn get_all(&self) -> Result<Vec<Component>> {
        self.read(|session| session.get_all_components().to_vec())
    }

    /// Register `component` and commit; returns its instance number.
    #[instrument(skip(self, component), fields(id = %component.id()))]
    pub fn register(&self, component: &Component) -> Result<Instance> {
        self.write(|session| session.register_component(component))
    }

    /// Unregister the component matching `component` and commit.
    #[instrument(skip(self, component), fields(id = %component.id()))]
    pub fn unregister(&self, component: &Component) -> Result<()> {
        self.write(|session| session.unregister_component(component))
    }

    /// Reference to the registered `id` at `location`.
    pub fn resolve_reference(
        &self,
        id: &str,
        location: &Path,
        version: Option<&str>,
    ) -> Result<ComponentRef> {
        self.read(|session| session.resolve_reference(id, location, version))?
    }

    /// Synthetic components for installed packages no registered component
    /// accounts for, preceded by the synthetic roots.
    pub fn get_sys_pkgs<F: FnMut(u32)>(&self, progress: F) -> Result<Vec<Component>> {
        let registered = self.get_all()?;
        self.overlay.synthesize(&registered, progress)
    }

    /// Flag damaged components in place; returns how many were flagged.
    pub fn flag_broken(&self, components: &mut [Component]) -> Result<usize> {
        let registered = self.get_all()?;
        Ok(self.overlay.flag_broken(components, &registered))
    }
}
