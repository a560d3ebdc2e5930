//! Tag stream to component list.
//!
//! The parser keeps a stack of open tags. Fields shared by every instance of
//! a version (id, version, unique name, vendor, display names) accumulate at
//! the outer levels and seed each `<compinstance>`. References are collected
//! inside `<compref>` and routed to the list named by the enclosing
//! `<parent>`, `<children>`, `<required>` or `<dependent>`.

use super::{ParsedRegistry, ReadOutcome};
use crate::component::{Component, ComponentRef, ComponentType};
use crate::error::{RegistryError, Result};
use crate::store::xml::{Tag, TagEvent, TagReader};
use crate::types::{Instance, REGISTRY_VERSION};

#[derive(Debug, Clone, Copy)]
enum RefTarget {
    Parent,
    Children,
    Required,
    Dependent,
}

#[derive(Debug, Default)]
struct PendingRef {
    id: Option<String>,
    instance: Option<Instance>,
    version: Option<String>,
}

#[derive(Debug, Default)]
struct Shared {
    version: Option<String>,
    unique_name: Option<String>,
    vendor: Option<String>,
    display_names: Vec<(String, String)>,
}

enum Step {
    Continue,
    Unsupported(String),
}

struct Parser<'a> {
    reader: TagReader<'a>,
    stack: Vec<Tag>,
    components: Vec<Component>,
    id: Option<String>,
    shared: Shared,
    pending_language: Option<String>,
    current: Option<Component>,
    ref_target: Option<RefTarget>,
    pending_ref: Option<PendingRef>,
    pending_key: Option<String>,
}

/// Parse registry text into components.
///
/// Never fails: structural errors stop the parse and keep whatever
/// components were complete, and a newer format version yields nothing.
pub fn parse_components(text: &str) -> ParsedRegistry {
    let mut parser = Parser {
        reader: TagReader::new(text),
        stack: Vec::new(),
        components: Vec::new(),
        id: None,
        shared: Shared::default(),
        pending_language: None,
        current: None,
        ref_target: None,
        pending_ref: None,
        pending_key: None,
    };

    match parser.run() {
        Ok(Step::Continue) => ParsedRegistry {
            components: parser.components,
            outcome: ReadOutcome::Clean,
        },
        Ok(Step::Unsupported(found)) => {
            tracing::warn!(
                found = %found,
                supported = REGISTRY_VERSION,
                "Registry format version is newer than supported; ignoring contents"
            );
            ParsedRegistry {
                components: Vec::new(),
                outcome: ReadOutcome::Unsupported(found),
            }
        }
        Err(e) => {
            tracing::warn!(
                recovered = parser.components.len(),
                "Registry parse stopped early: {}",
                e
            );
            ParsedRegistry {
                components: parser.components,
                outcome: ReadOutcome::Partial(e.to_string()),
            }
        }
    }
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> RegistryError {
        RegistryError::Parse {
            line: self.reader.line(),
            message: message.into(),
        }
    }

    fn run(&mut self) -> Result<Step> {
        while let Some(event) = self.reader.read_tag()? {
            match event {
                TagEvent::Open { tag, value } => {
                    if let Step::Unsupported(found) = self.open(tag, value)? {
                        return Ok(Step::Unsupported(found));
                    }
                    self.stack.push(tag);
                }
                TagEvent::Close { tag } => self.close(tag)?,
            }
        }
        if let Some(open) = self.stack.last() {
            return Err(self.error(format!("Unexpected end of file inside <{}>", open.name())));
        }
        Ok(Step::Continue)
    }

    fn misplaced(&self, tag: Tag) -> RegistryError {
        let parent = self.stack.last().map(|t| t.name()).unwrap_or("top level");
        self.error(format!("<{}> is not allowed inside {}", tag.name(), parent))
    }

    fn current_mut(&mut self, tag: Tag) -> Result<&mut Component> {
        let err = self.misplaced(tag);
        self.current.as_mut().ok_or(err)
    }

    fn parse_instance(&self, value: Option<&str>) -> Result<Instance> {
        let raw = value.unwrap_or("");
        match raw.parse::<Instance>() {
            Ok(instance) if instance >= 1 => Ok(instance),
            _ => Err(self.error(format!("Invalid instance number {:?}", raw))),
        }
    }

    fn open(&mut self, tag: Tag, value: Option<String>) -> Result<Step> {
        let parent = self.stack.last().copied();
        match (tag, parent) {
            (Tag::ProductRegistry, None) => {}

            (Tag::Version, Some(Tag::ProductRegistry)) => {
                let found = value.unwrap_or_default();
                if found.as_str() > REGISTRY_VERSION {
                    return Ok(Step::Unsupported(found));
                }
                tracing::debug!(version = %found, "Registry format version accepted");
            }
            (Tag::Version, Some(Tag::Instance)) => {
                if let Some(pending) = self.pending_ref.as_mut() {
                    pending.version = value;
                }
            }
            (Tag::Version, Some(Tag::Compatible)) => {
                if let Some(version) = value {
                    self.current_mut(tag)?.add_compatible_version(&version);
                }
            }

            (Tag::Components, Some(Tag::ProductRegistry)) => {}

            (Tag::CompId, Some(Tag::Components)) => {
                if value.is_none() {
                    return Err(self.error("<compid> without an id"));
                }
                self.id = value;
                self.shared = Shared::default();
            }
            (Tag::CompVersion, Some(Tag::CompId)) => {
                self.shared = Shared {
                    version: value,
                    ..Shared::default()
                };
            }
            (Tag::UniqueName, Some(Tag::CompVersion)) => self.shared.unique_name = value,
            (Tag::Vendor, Some(Tag::CompVersion)) => self.shared.vendor = value,
            (Tag::DisplayName, Some(Tag::CompVersion)) => self.pending_language = None,
            (Tag::Language, Some(Tag::DisplayName)) => self.pending_language = value,
            (Tag::LocalizedName | Tag::Name, Some(Tag::DisplayName)) => {
                match self.pending_language.take() {
                    Some(language) => self
                        .shared
                        .display_names
                        .push((language, value.unwrap_or_default())),
                    None => return Err(self.error("<localizedname> without <language>")),
                }
            }

            (Tag::CompInstance, Some(Tag::CompVersion)) => {
                let instance = self.parse_instance(value.as_deref())?;
                let id = self.id.clone().unwrap_or_default();
                let mut component = Component::new(&id);
                component.set_instance(instance);
                component.set_version(self.shared.version.as_deref());
                component.set_unique_name(self.shared.unique_name.as_deref());
                component.set_vendor(self.shared.vendor.as_deref());
                for (language, name) in &self.shared.display_names {
                    component.add_display_name(language, name);
                }
                self.current = Some(component);
            }

            (Tag::Parent, Some(Tag::CompInstance)) => self.ref_target = Some(RefTarget::Parent),
            (Tag::Children, Some(Tag::CompInstance)) => {
                self.ref_target = Some(RefTarget::Children)
            }
            (Tag::Required, Some(Tag::CompInstance)) => {
                self.ref_target = Some(RefTarget::Required)
            }
            (Tag::Dependent, Some(Tag::CompInstance)) => {
                self.ref_target = Some(RefTarget::Dependent)
            }
            (
                Tag::CompRef,
                Some(Tag::Parent | Tag::Children | Tag::Required | Tag::Dependent),
            ) => {
                self.pending_ref = Some(PendingRef {
                    id: value,
                    ..PendingRef::default()
                });
            }
            (Tag::Id, Some(Tag::CompRef)) => {
                if let Some(pending) = self.pending_ref.as_mut() {
                    pending.id = value;
                }
            }
            (Tag::Instance, Some(Tag::CompRef)) => {
                let instance = self.parse_instance(value.as_deref())?;
                if let Some(pending) = self.pending_ref.as_mut() {
                    pending.instance = Some(instance);
                }
            }

            (Tag::CompType, Some(Tag::CompInstance)) => {
                let raw = value.unwrap_or_default();
                let component_type = raw.parse::<ComponentType>().unwrap_or_else(|e| {
                    tracing::warn!("{}; defaulting to COMPONENT", e);
                    ComponentType::Component
                });
                self.current_mut(tag)?.set_component_type(component_type);
            }
            (Tag::Location, Some(Tag::CompInstance)) => {
                self.current_mut(tag)?.set_location_verbatim(value.as_deref());
            }
            (Tag::Uninstaller, Some(Tag::CompInstance)) => {
                self.current_mut(tag)?.set_uninstaller(value.as_deref());
            }
            (Tag::Compatible, Some(Tag::CompInstance)) => {}
            (Tag::Data, Some(Tag::CompInstance)) => self.pending_key = None,
            (Tag::Key, Some(Tag::Data)) => self.pending_key = value,
            (Tag::Value, Some(Tag::Data)) => match self.pending_key.take() {
                Some(key) => {
                    let value = value.unwrap_or_default();
                    self.current_mut(tag)?.set_app_data(&key, &value);
                }
                None => return Err(self.error("<value> without <key>")),
            },

            _ => return Err(self.misplaced(tag)),
        }
        Ok(Step::Continue)
    }

    fn close(&mut self, tag: Tag) -> Result<()> {
        match self.stack.pop() {
            Some(open) if open == tag => {}
            Some(open) => {
                return Err(self.error(format!(
                    "Mismatched </{}>, expected </{}>",
                    tag.name(),
                    open.name()
                )))
            }
            None => return Err(self.error(format!("Unmatched </{}>", tag.name()))),
        }

        match tag {
            Tag::CompInstance => {
                if let Some(component) = self.current.take() {
                    self.components.push(component);
                }
            }
            Tag::CompRef => self.finish_ref()?,
            Tag::Parent | Tag::Children | Tag::Required | Tag::Dependent => {
                self.ref_target = None
            }
            Tag::DisplayName => self.pending_language = None,
            Tag::CompVersion => self.shared = Shared::default(),
            Tag::CompId => self.id = None,
            _ => {}
        }
        Ok(())
    }

    fn finish_ref(&mut self) -> Result<()> {
        let pending = self.pending_ref.take().unwrap_or_default();
        let (id, instance) = match (pending.id, pending.instance) {
            (Some(id), Some(instance)) => (id, instance),
            (id, _) => {
                tracing::warn!(
                    "Dropping reference to {:?} without an instance number",
                    id.unwrap_or_default()
                );
                return Ok(());
            }
        };
        let reference = ComponentRef::new(&id, instance, pending.version.as_deref());
        let target = self.ref_target;
        let component = self.current_mut(Tag::CompRef)?;
        match target {
            Some(RefTarget::Parent) => component.set_parent(Some(reference)),
            Some(RefTarget::Children) => component.add_child(reference),
            Some(RefTarget::Required) => component.add_required(reference),
            Some(RefTarget::Dependent) => component.add_dependent(reference),
            None => {}
        }
        Ok(())
    }
}
