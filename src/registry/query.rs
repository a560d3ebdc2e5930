//! Query constraints over the component set.

use crate::component::path::canonicalize_location;
use crate::component::Component;
use crate::types::Instance;
use std::path::{Path, PathBuf};

/// Conjunction of optional exact-match constraints. An empty query matches
/// every component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub id: Option<String>,
    pub unique_name: Option<String>,
    pub version: Option<String>,
    pub instance: Option<Instance>,
    pub location: Option<PathBuf>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.trim().to_string());
        self
    }

    pub fn with_unique_name(mut self, unique_name: &str) -> Self {
        self.unique_name = Some(unique_name.trim().to_string());
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.trim().to_string());
        self
    }

    pub fn with_instance(mut self, instance: Instance) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Constrain on location; compared in canonical form.
    pub fn with_location(mut self, location: &Path) -> Self {
        self.location = Some(canonicalize_location(location));
        self
    }

    /// Query naming exactly this component's (id, instance).
    pub fn for_component(component: &Component) -> Self {
        Self::new()
            .with_id(component.id())
            .with_instance(component.instance())
    }

    pub fn matches(&self, component: &Component) -> bool {
        self.id.as_deref().map_or(true, |id| component.id() == id)
            && self
                .unique_name
                .as_deref()
                .map_or(true, |name| component.unique_name() == Some(name))
            && self
                .version
                .as_deref()
                .map_or(true, |version| component.version() == Some(version))
            && self
                .instance
                .map_or(true, |instance| component.instance() == instance)
            && self
                .location
                .as_deref()
                .map_or(true, |location| component.location() == Some(location))
    }
}
