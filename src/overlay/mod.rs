//! Package database overlay
//!
//! Surfaces packages installed through the host package system that no
//! registered component accounts for. Each becomes a synthetic component
//! (id = package directory name, instance 1) placed under one of a fixed set
//! of synthetic roots. Synthetic components are never written back.

pub mod damage;
pub mod pkginfo;

pub use pkginfo::{PackageClass, PkgInfo};

use crate::component::{Component, ComponentType};
use crate::error::{RegistryError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const ENTIRE_DISTRIBUTION: &str = "entire-distribution";
pub const LOCALIZATION: &str = "localization";
pub const ADDITIONAL_SOFTWARE: &str = "additional-software";
pub const UNCLASSIFIED: &str = "unclassified";

/// Id of the per-release system software root.
pub fn system_software_id(release: &str) -> String {
    format!("system-software-{}", release.trim())
}

/// View of the host package database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOverlay {
    pkg_dir: PathBuf,
    release: String,
}

impl PackageOverlay {
    pub fn new(pkg_dir: impl Into<PathBuf>, release: &str) -> Self {
        Self {
            pkg_dir: pkg_dir.into(),
            release: release.trim().to_string(),
        }
    }

    pub fn pkg_dir(&self) -> &Path {
        &self.pkg_dir
    }

    pub(crate) fn set_pkg_dir(&mut self, pkg_dir: PathBuf) {
        self.pkg_dir = pkg_dir;
    }

    pub fn release(&self) -> &str {
        &self.release
    }

    /// Whether `package` has a non-empty pkginfo file.
    pub fn is_installed(&self, package: &str) -> bool {
        std::fs::metadata(self.pkg_dir.join(package).join(pkginfo::PKGINFO_FILE))
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    /// Package directories, sorted by name.
    fn package_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in WalkDir::new(&self.pkg_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    let path = self.pkg_dir.clone();
                    return Err(match e.into_io_error() {
                        Some(io) => RegistryError::io(path, io),
                        None => RegistryError::NotFound(path.display().to_string()),
                    });
                }
                Err(e) => {
                    warn!("Skipping unreadable package entry: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                dirs.push(entry.into_path());
            }
        }
        Ok(dirs)
    }

    /// Every package with a readable, non-empty pkginfo. `progress` receives
    /// the percentage of package directories examined, ending at 100.
    pub fn read_packages<F: FnMut(u32)>(&self, mut progress: F) -> Result<Vec<PkgInfo>> {
        let dirs = self.package_dirs()?;
        let total = dirs.len();
        let mut packages = Vec::with_capacity(total);
        for (done, dir) in dirs.iter().enumerate() {
            match PkgInfo::read(dir) {
                Ok(Some(info)) => packages.push(info),
                Ok(None) => debug!(dir = %dir.display(), "No pkginfo; not a package"),
                Err(e) => warn!("Skipping package {}: {}", dir.display(), e),
            }
            progress(((done + 1) * 100 / total) as u32);
        }
        if total == 0 {
            progress(100);
        }
        Ok(packages)
    }

    /// The synthetic roots, in display order.
    pub fn roots(&self) -> Vec<Component> {
        let system_id = system_software_id(&self.release);
        let mut entire = root(ENTIRE_DISTRIBUTION, "Entire Software Distribution");
        entire.set_component_type(ComponentType::Product);
        let mut system = root(&system_id, &format!("Solaris {} System Software", self.release));
        let mut localization = root(LOCALIZATION, "Solaris Localization Software");
        for child in [&mut system, &mut localization] {
            child.set_parent(Some(entire.to_ref()));
            entire.add_child(child.to_ref());
        }
        let additional = root(ADDITIONAL_SOFTWARE, "Additional System Software");
        let unclassified = root(UNCLASSIFIED, "Unclassified Software");
        vec![entire, system, localization, additional, unclassified]
    }

    fn root_for(&self, class: PackageClass) -> String {
        match class {
            PackageClass::System => system_software_id(&self.release),
            PackageClass::Localization => LOCALIZATION.to_string(),
            PackageClass::Application => ADDITIONAL_SOFTWARE.to_string(),
            PackageClass::Unclassified => UNCLASSIFIED.to_string(),
        }
    }

    /// Synthetic roots followed by one component per package not claimed by
    /// `registered` (through its `pkgs` app data or its id).
    ///
    /// A missing package directory yields no components at all.
    pub fn synthesize<F: FnMut(u32)>(
        &self,
        registered: &[Component],
        progress: F,
    ) -> Result<Vec<Component>> {
        if !self.pkg_dir.is_dir() {
            debug!(pkg_dir = %self.pkg_dir.display(), "No package database");
            return Ok(Vec::new());
        }

        let claimed: HashSet<&str> = registered
            .iter()
            .flat_map(|c| c.packages().into_iter().chain(std::iter::once(c.id())))
            .collect();

        let mut roots = self.roots();
        let mut packages = Vec::new();
        for info in self.read_packages(progress)? {
            if claimed.contains(info.package.as_str()) {
                continue;
            }
            let root_id = self.root_for(info.class());
            let mut component = info.to_component();
            if let Some(root) = roots.iter_mut().find(|r| r.id() == root_id) {
                component.set_parent(Some(root.to_ref()));
                root.add_child(component.to_ref());
            }
            packages.push(component);
        }

        debug!(
            surfaced = packages.len(),
            claimed = claimed.len(),
            "Surfaced unregistered packages"
        );
        roots.extend(packages);
        Ok(roots)
    }
}

fn root(id: &str, name: &str) -> Component {
    let mut component = Component::synthetic(id);
    component.set_component_type(ComponentType::Feature);
    component.add_display_name("en", name);
    component
}
