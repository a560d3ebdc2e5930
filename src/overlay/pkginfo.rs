//! `pkginfo` metadata files of the host package database.
//!
//! Each installed package has a directory under the package root holding a
//! `pkginfo` file of `KEY=VALUE` lines. Values may be quoted; `#` starts a
//! comment line.

use crate::component::{Component, PKGS_KEY};
use crate::error::{RegistryError, Result};
use crate::store::file_set::decode_lossy;
use std::path::Path;

/// File name of the package metadata file inside a package directory.
pub const PKGINFO_FILE: &str = "pkginfo";

/// App data key holding the package CATEGORY.
pub const CATEGORY_KEY: &str = "category";

/// App data key holding the package DESC.
pub const DESCRIPTION_KEY: &str = "description";

/// Where a package sits under the synthetic roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageClass {
    System,
    Localization,
    Application,
    Unclassified,
}

/// Fields of one package's `pkginfo` surfaced on its synthetic component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PkgInfo {
    /// Package instance name (the directory name)
    pub package: String,
    pub pkg: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub vendor: Option<String>,
    pub basedir: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    value
}

impl PkgInfo {
    /// Parse `pkginfo` text for the package directory named `package`.
    /// Unknown keys and malformed lines are ignored.
    pub fn parse(package: &str, text: &str) -> Self {
        let mut info = PkgInfo {
            package: package.trim().to_string(),
            ..Default::default()
        };
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = unquote(value);
            if value.is_empty() {
                continue;
            }
            let slot = match key.trim() {
                "PKG" => &mut info.pkg,
                "NAME" => &mut info.name,
                "VERSION" => &mut info.version,
                "VENDOR" => &mut info.vendor,
                "BASEDIR" => &mut info.basedir,
                "CATEGORY" => &mut info.category,
                "DESC" => &mut info.description,
                _ => continue,
            };
            *slot = Some(value.to_string());
        }
        info
    }

    /// Read `<package_dir>/pkginfo`. `None` when the file is absent or empty.
    pub fn read(package_dir: &Path) -> Result<Option<Self>> {
        let path = package_dir.join(PKGINFO_FILE);
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {}
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RegistryError::io(path, e)),
        }
        let bytes = std::fs::read(&path).map_err(|e| RegistryError::io(&path, e))?;
        let text = decode_lossy(&path, bytes);
        let package = package_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Some(Self::parse(&package, &text)))
    }

    /// Placement by CATEGORY, a comma-separated list. Localization wins over
    /// system since localization packages usually carry both.
    pub fn class(&self) -> PackageClass {
        let categories: Vec<String> = self
            .category
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(|c| c.trim().to_ascii_lowercase())
            .collect();
        let has = |name: &str| categories.iter().any(|c| c == name);
        if has("localization") || has("l10n") {
            PackageClass::Localization
        } else if has("system") {
            PackageClass::System
        } else if has("application") {
            PackageClass::Application
        } else {
            PackageClass::Unclassified
        }
    }

    /// Synthetic component for this package, with no parent yet.
    pub fn to_component(&self) -> Component {
        let mut component = Component::synthetic(&self.package);
        component.set_version(self.version.as_deref());
        component.set_vendor(self.vendor.as_deref());
        if let Some(name) = &self.name {
            component.add_display_name("en", name);
        }
        if let Some(basedir) = &self.basedir {
            component.set_location(Some(Path::new(basedir)));
        }
        if let Some(category) = &self.category {
            component.set_app_data(CATEGORY_KEY, category);
        }
        if let Some(description) = &self.description {
            component.set_app_data(DESCRIPTION_KEY, description);
        }
        component.set_app_data(PKGS_KEY, &self.package);
        component
    }
}
