//! Registered software components.
//!
//! A [`Component`] is a plain value: scalar fields, localized display names,
//! application data, compatible versions and four relationship sets. Components
//! refer to each other by [`ComponentRef`] (id + instance), never by pointer;
//! the registry resolves references by lookup in its own component list.

pub mod path;
pub mod reference;
pub mod version;

pub use reference::{ComponentRef, RefList};

use crate::types::Instance;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Component kind as written in `<comptype>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ComponentType {
    Product,
    Feature,
    #[default]
    Component,
}

impl ComponentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Product => "PRODUCT",
            ComponentType::Feature => "FEATURE",
            ComponentType::Component => "COMPONENT",
        }
    }
}

impl FromStr for ComponentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PRODUCT" => Ok(ComponentType::Product),
            "FEATURE" => Ok(ComponentType::Feature),
            "COMPONENT" => Ok(ComponentType::Component),
            other => Err(format!("Unknown component type: {}", other)),
        }
    }
}

/// App data key naming the space-separated packages a component installed.
pub const PKGS_KEY: &str = "pkgs";

/// App data key set by the damaged-package pass.
pub const DAMAGED_KEY: &str = "isDamaged";

fn clean(value: &str) -> String {
    value.trim().to_string()
}

fn clean_optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// A registered (or to-be-registered) software component.
///
/// `instance` is 0 until the registry assigns one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Component {
    id: String,
    instance: Instance,
    version: Option<String>,
    unique_name: Option<String>,
    display_names: Vec<(String, String)>,
    vendor: Option<String>,
    component_type: ComponentType,
    location: Option<PathBuf>,
    uninstaller: Option<String>,
    compatible_versions: Vec<String>,
    parent: Option<ComponentRef>,
    children: RefList,
    required: RefList,
    dependents: RefList,
    app_data: Vec<(String, String)>,
    #[serde(skip)]
    synthetic: bool,
}

impl Component {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self {
            id: clean(id.as_ref()),
            ..Default::default()
        }
    }

    pub(crate) fn synthetic(id: impl AsRef<str>) -> Self {
        Self {
            synthetic: true,
            instance: 1,
            ..Self::new(id)
        }
    }

    /// Synthetic components come from the package database and are never persisted.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    pub(crate) fn clear_synthetic(&mut self) {
        self.synthetic = false;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: &str) {
        self.id = clean(id);
    }

    pub fn instance(&self) -> Instance {
        self.instance
    }

    pub fn set_instance(&mut self, instance: Instance) {
        self.instance = instance;
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn set_version(&mut self, version: Option<&str>) {
        self.version = clean_optional(version);
    }

    pub fn unique_name(&self) -> Option<&str> {
        self.unique_name.as_deref()
    }

    pub fn set_unique_name(&mut self, unique_name: Option<&str>) {
        self.unique_name = clean_optional(unique_name);
    }

    pub fn vendor(&self) -> Option<&str> {
        self.vendor.as_deref()
    }

    pub fn set_vendor(&mut self, vendor: Option<&str>) {
        self.vendor = clean_optional(vendor);
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    pub fn set_component_type(&mut self, component_type: ComponentType) {
        self.component_type = component_type;
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Store the canonical form of `location` (see [`path::canonicalize_location`]).
    pub fn set_location(&mut self, location: Option<&Path>) {
        self.location = location.and_then(|loc| {
            let trimmed = match loc.to_str() {
                Some(s) => PathBuf::from(s.trim()),
                None => loc.to_path_buf(),
            };
            if trimmed.as_os_str().is_empty() {
                None
            } else {
                Some(path::canonicalize_location(&trimmed))
            }
        });
    }

    /// Store a location read from disk, where it is already canonical.
    pub(crate) fn set_location_verbatim(&mut self, location: Option<&str>) {
        self.location = clean_optional(location).map(PathBuf::from);
    }

    pub fn uninstaller(&self) -> Option<&str> {
        self.uninstaller.as_deref()
    }

    pub fn set_uninstaller(&mut self, uninstaller: Option<&str>) {
        self.uninstaller = clean_optional(uninstaller);
    }

    // --- display names ---

    /// Add or replace the display name for `language`. A blank language is ignored.
    pub fn add_display_name(&mut self, language: &str, name: &str) {
        let language = clean(language);
        if language.is_empty() {
            return;
        }
        let name = clean(name);
        match self.display_names.iter_mut().find(|(lang, _)| *lang == language) {
            Some(entry) => entry.1 = name,
            None => self.display_names.push((language, name)),
        }
    }

    pub fn remove_display_name(&mut self, language: &str) -> bool {
        let language = language.trim();
        let before = self.display_names.len();
        self.display_names.retain(|(lang, _)| lang != language);
        before != self.display_names.len()
    }

    pub fn display_name(&self, language: &str) -> Option<&str> {
        let language = language.trim();
        self.display_names
            .iter()
            .find(|(lang, _)| lang == language)
            .map(|(_, name)| name.as_str())
    }

    pub fn display_languages(&self) -> Vec<&str> {
        self.display_names.iter().map(|(lang, _)| lang.as_str()).collect()
    }

    pub fn display_names(&self) -> &[(String, String)] {
        &self.display_names
    }

    // --- compatible versions ---

    /// Append a compatible version; an existing equal entry is moved to the end.
    pub fn add_compatible_version(&mut self, version: &str) {
        let version = clean(version);
        if version.is_empty() {
            return;
        }
        self.compatible_versions.retain(|v| *v != version);
        self.compatible_versions.push(version);
    }

    pub fn remove_compatible_version(&mut self, version: &str) -> bool {
        let version = version.trim();
        let before = self.compatible_versions.len();
        self.compatible_versions.retain(|v| v != version);
        before != self.compatible_versions.len()
    }

    pub fn compatible_versions(&self) -> &[String] {
        &self.compatible_versions
    }

    // --- relationships ---

    pub fn parent(&self) -> Option<&ComponentRef> {
        self.parent.as_ref()
    }

    pub fn set_parent(&mut self, parent: Option<ComponentRef>) {
        self.parent = parent;
    }

    pub fn children(&self) -> &RefList {
        &self.children
    }

    pub fn add_child(&mut self, child: ComponentRef) {
        self.children.add(child);
    }

    pub fn remove_child(&mut self, id: &str, instance: Instance) -> bool {
        self.children.remove(id, instance)
    }

    pub fn required(&self) -> &RefList {
        &self.required
    }

    pub fn add_required(&mut self, required: ComponentRef) {
        self.required.add(required);
    }

    pub fn remove_required(&mut self, id: &str, instance: Instance) -> bool {
        self.required.remove(id, instance)
    }

    /// Components requiring this one. Maintained by the registry.
    pub fn dependents(&self) -> &RefList {
        &self.dependents
    }

    pub fn add_dependent(&mut self, dependent: ComponentRef) {
        self.dependents.add(dependent);
    }

    pub fn remove_dependent(&mut self, id: &str, instance: Instance) -> bool {
        self.dependents.remove(id, instance)
    }

    pub(crate) fn replace_dependents(&mut self, dependents: RefList) {
        self.dependents = dependents;
    }

    // --- app data ---

    pub fn app_data(&self, key: &str) -> Option<&str> {
        let key = key.trim();
        self.app_data
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set `key` to `value`, replacing an existing value in place. A blank
    /// key is ignored.
    pub fn set_app_data(&mut self, key: &str, value: &str) {
        let key = clean(key);
        if key.is_empty() {
            return;
        }
        let value = clean(value);
        match self.app_data.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.app_data.push((key, value)),
        }
    }

    pub fn remove_app_data(&mut self, key: &str) -> bool {
        let key = key.trim();
        let before = self.app_data.len();
        self.app_data.retain(|(k, _)| k != key);
        before != self.app_data.len()
    }

    pub fn app_data_pairs(&self) -> &[(String, String)] {
        &self.app_data
    }

    /// Packages listed under the `pkgs` app data key.
    pub fn packages(&self) -> Vec<&str> {
        self.app_data(PKGS_KEY)
            .map(|pkgs| pkgs.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Reference to this component.
    pub fn to_ref(&self) -> ComponentRef {
        ComponentRef {
            id: self.id.clone(),
            instance: self.instance,
            version: self.version.clone(),
        }
    }

    pub fn is(&self, id: &str, instance: Instance) -> bool {
        self.id == id && self.instance == instance
    }
}

fn same_set<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().all(|item| b.contains(item))
}

/// Scalar fields compare exactly; list fields compare as sets.
impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.instance == other.instance
            && self.version == other.version
            && self.unique_name == other.unique_name
            && self.vendor == other.vendor
            && self.component_type == other.component_type
            && self.location == other.location
            && self.uninstaller == other.uninstaller
            && self.parent == other.parent
            && same_set(&self.display_names, &other.display_names)
            && same_set(&self.compatible_versions, &other.compatible_versions)
            && same_set(&self.app_data, &other.app_data)
            && self.children == other.children
            && self.required == other.required
            && self.dependents == other.dependents
    }
}

impl Eq for Component {}
