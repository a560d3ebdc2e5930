//! Lightweight references between components.

use crate::types::Instance;
use serde::{Deserialize, Serialize};

/// Reference to another component by (id, instance).
///
/// The version is informational; two references are the same reference when
/// id and instance agree.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct ComponentRef {
    pub id: String,
    pub instance: Instance,
    pub version: Option<String>,
}

impl ComponentRef {
    pub fn new(id: impl AsRef<str>, instance: Instance, version: Option<&str>) -> Self {
        Self {
            id: id.as_ref().trim().to_string(),
            instance,
            version: version
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        }
    }

    /// True when this reference names the given (id, instance).
    pub fn points_to(&self, id: &str, instance: Instance) -> bool {
        self.id == id && self.instance == instance
    }
}

impl PartialEq for ComponentRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.instance == other.instance
    }
}

impl std::hash::Hash for ComponentRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.instance.hash(state);
    }
}

impl std::fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}#{}@{}", self.id, self.instance, version),
            None => write!(f, "{}#{}", self.id, self.instance),
        }
    }
}

/// Ordered, duplicate-free list of references keyed by (id, instance).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefList(Vec<ComponentRef>);

impl RefList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a reference, replacing any existing entry for the same (id, instance)
    /// in place.
    pub fn add(&mut self, reference: ComponentRef) {
        match self.0.iter_mut().find(|r| **r == reference) {
            Some(existing) => *existing = reference,
            None => self.0.push(reference),
        }
    }

    /// Remove the entry for (id, instance); returns whether one was present.
    pub fn remove(&mut self, id: &str, instance: Instance) -> bool {
        let before = self.0.len();
        self.0.retain(|r| !r.points_to(id, instance));
        before != self.0.len()
    }

    pub fn contains(&self, id: &str, instance: Instance) -> bool {
        self.0.iter().any(|r| r.points_to(id, instance))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ComponentRef> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ComponentRef] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// References present in `self` but not in `other`.
    pub fn difference(&self, other: &RefList) -> Vec<ComponentRef> {
        self.0
            .iter()
            .filter(|r| !other.contains(&r.id, r.instance))
            .cloned()
            .collect()
    }
}

/// Lists compare as sets.
impl PartialEq for RefList {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.0.iter().all(|r| other.contains(&r.id, r.instance))
    }
}

impl Eq for RefList {}

impl<'a> IntoIterator for &'a RefList {
    type Item = &'a ComponentRef;
    type IntoIter = std::slice::Iter<'a, ComponentRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<ComponentRef> for RefList {
    fn from_iter<I: IntoIterator<Item = ComponentRef>>(iter: I) -> Self {
        let mut list = RefList::new();
        for reference in iter {
            list.add(reference);
        }
        list
    }
}
