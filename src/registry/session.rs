//! Registry sessions: open, query, register, unregister, close.
//!
//! A session owns the in-memory component list for one open/close cycle.
//! Components are kept grouped by id, then ordered by version and instance
//! within the id. References between components are (id, instance) pairs and
//! are always resolved by lookup in this list.

use super::query::Query;
use crate::codec::{self, ReadOutcome};
use crate::component::path::canonicalize_location;
use crate::component::version::compare_optional_versions;
use crate::component::{Component, ComponentRef, RefList};
use crate::error::{RegistryError, Result};
use crate::store::{RegistryFiles, XmlFileIo};
use crate::types::{AccessMode, Instance, REGISTRY_VERSION};
use std::cmp::Ordering;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};

/// One open/close cycle over the registry.
pub struct RegistrySession {
    io: XmlFileIo,
    components: Vec<Component>,
    outcome: ReadOutcome,
    dirty: bool,
}

impl RegistrySession {
    /// Open the registry file set and load its components.
    ///
    /// A missing registry file is an empty registry. Parse errors leave the
    /// components read before the error; a newer format version leaves none and
    /// makes the session refuse mutations.
    pub fn open(files: RegistryFiles, mode: AccessMode) -> Result<Self> {
        let io = XmlFileIo::open(files, mode)?;
        let parsed = codec::read_registry(&io)?;
        if parsed.outcome != ReadOutcome::Clean {
            warn!(outcome = ?parsed.outcome, "Registry opened with degraded contents");
        }
        Ok(Self {
            io,
            components: parsed.components,
            outcome: parsed.outcome,
            dirty: false,
        })
    }

    pub fn mode(&self) -> AccessMode {
        self.io.mode()
    }

    pub fn files(&self) -> &RegistryFiles {
        self.io.files()
    }

    /// Result of reading the registry file at open.
    pub fn read_outcome(&self) -> &ReadOutcome {
        &self.outcome
    }

    /// Whether the in-memory set differs from what was read.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn ensure_writable(&self) -> Result<()> {
        if !self.mode().is_writable() {
            return Err(RegistryError::ReadOnly(
                "session opened for reading".to_string(),
            ));
        }
        if let ReadOutcome::Unsupported(found) = &self.outcome {
            return Err(RegistryError::VersionUnsupported {
                found: found.clone(),
                supported: REGISTRY_VERSION.to_string(),
            });
        }
        Ok(())
    }

    fn find(&self, id: &str, instance: Instance) -> Option<&Component> {
        self.components.iter().find(|c| c.is(id, instance))
    }

    fn find_mut(&mut self, id: &str, instance: Instance) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.is(id, instance))
    }

    /// Clones of every component matching `query`.
    pub fn query(&self, query: &Query) -> Vec<Component> {
        self.components
            .iter()
            .filter(|c| query.matches(c))
            .cloned()
            .collect()
    }

    /// First component matching `query`.
    pub fn get(&self, query: &Query) -> Option<Component> {
        self.components.iter().find(|c| query.matches(c)).cloned()
    }

    /// The in-memory component list itself.
    pub fn get_all_components(&self) -> &[Component] {
        &self.components
    }

    /// Resolve a reference from (id, location, version) to a full reference
    /// carrying the instance number.
    pub fn resolve_reference(
        &self,
        id: &str,
        location: &Path,
        version: Option<&str>,
    ) -> Result<ComponentRef> {
        let mut query = Query::new().with_id(id).with_location(location);
        if let Some(version) = version {
            query = query.with_version(version);
        }
        self.components
            .iter()
            .find(|c| query.matches(c))
            .map(Component::to_ref)
            .ok_or_else(|| RegistryError::InstanceUnresolvable {
                id: id.trim().to_string(),
                location: canonicalize_location(location).display().to_string(),
            })
    }

    pub fn get_parent(&self, component: &Component) -> Option<Component> {
        component
            .parent()
            .and_then(|p| self.find(&p.id, p.instance))
            .cloned()
    }

    pub fn get_children(&self, component: &Component) -> Vec<Component> {
        self.resolve_all(component.children())
    }

    pub fn get_required(&self, component: &Component) -> Vec<Component> {
        self.resolve_all(component.required())
    }

    pub fn get_dependents(&self, component: &Component) -> Vec<Component> {
        self.resolve_all(component.dependents())
    }

    fn resolve_all(&self, refs: &RefList) -> Vec<Component> {
        refs.iter()
            .filter_map(|r| self.find(&r.id, r.instance))
            .cloned()
            .collect()
    }

    /// References to every component whose required list names (id, instance).
    fn derived_dependents(&self, id: &str, instance: Instance) -> RefList {
        self.components
            .iter()
            .filter(|c| c.required().contains(id, instance))
            .map(Component::to_ref)
            .collect()
    }

    /// Index at which a new instance of `component.id()` keeps the id group
    /// ordered by (version, instance).
    fn insertion_point(&self, component: &Component) -> usize {
        let mut last_of_id = None;
        for (index, existing) in self.components.iter().enumerate() {
            if existing.id() != component.id() {
                continue;
            }
            let ordering = compare_optional_versions(existing.version(), component.version())
                .then(existing.instance().cmp(&component.instance()));
            if ordering == Ordering::Greater {
                return index;
            }
            last_of_id = Some(index);
        }
        last_of_id.map_or(self.components.len(), |index| index + 1)
    }

    /// Register `component`, returning the instance number it was stored under.
    ///
    /// An existing component with the same (id, location) is overwritten and
    /// keeps its instance; children and required components dropped
    /// by the new record lose their parent and dependent back-links. Otherwise
    /// the component is inserted with one more than the highest instance
    /// currently registered for its id. Numbers are not reserved once retired:
    /// after the highest instance is unregistered, its number is handed out
    /// again. Either way every required component gains a dependent back-link
    /// and every parentless child gets this component as parent.
    ///
    /// A blank id or a parent, child or required reference without an id is
    /// refused with [`RegistryError::InvalidComponent`], and one without an
    /// instance number with [`RegistryError::InstanceUnresolvable`]. A parent
    /// that is not registered is dropped. Caller-supplied dependents are
    /// ignored; the registry derives them.
    #[instrument(skip(self, component), fields(id = %component.id()))]
    pub fn register_component(&mut self, component: &Component) -> Result<Instance> {
        self.ensure_writable()?;
        check_storable(component)?;

        let mut incoming = component.clone();
        incoming.clear_synthetic();

        let existing = self
            .components
            .iter()
            .position(|c| c.id() == incoming.id() && c.location() == incoming.location());

        let (id, instance) = match existing {
            Some(index) => {
                let (id, instance) = {
                    let prev = &self.components[index];
                    (prev.id().to_string(), prev.instance())
                };
                incoming.set_instance(instance);
                incoming.replace_dependents(self.components[index].dependents().clone());
                let prev = std::mem::replace(&mut self.components[index], incoming);
                let placed = &self.components[index];
                let dropped_children = prev.children().difference(placed.children());
                let dropped_required = prev.required().difference(placed.required());

                for child in dropped_children {
                    if let Some(target) = self.find_mut(&child.id, child.instance) {
                        if target
                            .parent()
                            .is_some_and(|p| p.points_to(&id, instance))
                        {
                            target.set_parent(None);
                        }
                    }
                }
                for required in dropped_required {
                    if let Some(target) = self.find_mut(&required.id, required.instance) {
                        target.remove_dependent(&id, instance);
                    }
                }
                // A version change can move the record within its id group.
                if prev.version() != self.components[index].version() {
                    let moved = self.components.remove(index);
                    let at = self.insertion_point(&moved);
                    self.components.insert(at, moved);
                }
                info!(instance, "Overwrote registered component");
                (id, instance)
            }
            None => {
                let instance = self
                    .components
                    .iter()
                    .filter(|c| c.id() == incoming.id())
                    .map(Component::instance)
                    .max()
                    .unwrap_or(0)
                    + 1;
                incoming.set_instance(instance);
                let id = incoming.id().to_string();
                incoming.replace_dependents(self.derived_dependents(&id, instance));
                let index = self.insertion_point(&incoming);
                self.components.insert(index, incoming);
                info!(instance, "Registered new component instance");
                (id, instance)
            }
        };

        let dangling_parent = self
            .find(&id, instance)
            .and_then(Component::parent)
            .filter(|p| self.find(&p.id, p.instance).is_none())
            .cloned();
        if let Some(parent) = dangling_parent {
            debug!(parent = %parent, "Dropping parent that is not registered");
            if let Some(target) = self.find_mut(&id, instance) {
                target.set_parent(None);
            }
        }

        let placed = match self.find(&id, instance) {
            Some(placed) => placed.clone(),
            None => return Err(RegistryError::NotFound(format!("{}#{}", id, instance))),
        };
        let me = placed.to_ref();
        for required in placed.required() {
            match self.find_mut(&required.id, required.instance) {
                Some(target) => target.add_dependent(me.clone()),
                None => debug!(required = %required, "Required component not registered"),
            }
        }
        for child in placed.children() {
            if let Some(target) = self.find_mut(&child.id, child.instance) {
                if target.parent().is_none() {
                    target.set_parent(Some(me.clone()));
                }
            }
        }

        self.dirty = true;
        Ok(instance)
    }

    /// Remove the component matching `target` on id, unique name, version,
    /// instance and location.
    ///
    /// Components naming it as parent lose that parent, and components it
    /// required lose it as a dependent. Nothing cascades: children and
    /// dependents stay registered.
    #[instrument(skip(self, target), fields(id = %target.id(), instance = target.instance()))]
    pub fn unregister_component(&mut self, target: &Component) -> Result<()> {
        self.ensure_writable()?;

        let index = self
            .components
            .iter()
            .position(|c| {
                c.id() == target.id()
                    && c.unique_name() == target.unique_name()
                    && c.version() == target.version()
                    && c.instance() == target.instance()
                    && c.location() == target.location()
            })
            .ok_or_else(|| {
                RegistryError::NotFound(format!("{}#{}", target.id(), target.instance()))
            })?;

        let removed = self.components.remove(index);
        let (id, instance) = (removed.id(), removed.instance());

        for component in self.components.iter_mut() {
            if component.parent().is_some_and(|p| p.points_to(id, instance)) {
                component.set_parent(None);
            }
        }
        for required in removed.required() {
            if let Some(component) = self.find_mut(&required.id, required.instance) {
                component.remove_dependent(id, instance);
            }
        }

        if !removed.dependents().is_empty() {
            warn!(
                dependents = removed.dependents().len(),
                "Unregistered a component other components still require"
            );
        }
        info!("Unregistered component");
        self.dirty = true;
        Ok(())
    }

    /// End the session. A mutated read-write session is serialized and
    /// committed through the atomic swap; returns whether a commit happened.
    pub fn close(self) -> Result<bool> {
        let Self {
            mut io,
            components,
            dirty,
            ..
        } = self;

        if !dirty || !io.mode().is_writable() {
            return io.close();
        }

        let files = io.files().clone();
        if let Err(e) = codec::write_registry(&mut io, &components) {
            error!("Abandoning registry commit: {}", e);
            io.abandon();
            return Err(e);
        }
        if let Err(e) = io.close() {
            error!("Registry commit failed: {}", e);
            codec::snapshot::invalidate(files.current());
            return Err(e);
        }
        codec::remember_commit(&files, &components);
        Ok(true)
    }
}

/// Refuse what the registry file cannot hold: a blank id, or a parent, child
/// or required reference missing its id or instance number.
fn check_storable(component: &Component) -> Result<()> {
    if component.id().is_empty() {
        return Err(RegistryError::InvalidComponent("component id is blank".to_string()));
    }
    let references = component
        .parent()
        .into_iter()
        .chain(component.children().iter())
        .chain(component.required().iter());
    for reference in references {
        if reference.id.trim().is_empty() {
            return Err(RegistryError::InvalidComponent(format!(
                "{} references a component with a blank id",
                component.id()
            )));
        }
        if reference.instance == 0 {
            return Err(RegistryError::InstanceUnresolvable {
                id: reference.id.clone(),
                location: "an unspecified location".to_string(),
            });
        }
    }
    Ok(())
}
