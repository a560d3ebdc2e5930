//! Damaged-component detection.
//!
//! A component is damaged when a package named in its `pkgs` app data is no
//! longer installed, or when any of its children (transitively) is damaged.

use super::PackageOverlay;
use crate::component::{Component, DAMAGED_KEY};
use crate::types::Instance;
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Value stored under `isDamaged`.
pub const DAMAGED_VALUE: &str = "TRUE";

struct DamageCheck<'a> {
    overlay: &'a PackageOverlay,
    lookup: HashMap<(&'a str, Instance), &'a Component>,
    verdicts: HashMap<(&'a str, Instance), bool>,
    in_progress: HashSet<(&'a str, Instance)>,
    installed: HashMap<&'a str, bool>,
}

/// Result of visiting one component.
#[derive(Clone, Copy)]
struct Visit {
    damaged: bool,
    /// The verdict leaned on a component still being visited higher up.
    provisional: bool,
}

impl<'a> DamageCheck<'a> {
    fn new(overlay: &'a PackageOverlay, universe: &'a [Component], targets: &'a [Component]) -> Self {
        // Targets shadow universe entries with the same (id, instance).
        let lookup = universe
            .iter()
            .chain(targets)
            .map(|c| ((c.id(), c.instance()), c))
            .collect();
        Self {
            overlay,
            lookup,
            verdicts: HashMap::new(),
            in_progress: HashSet::new(),
            installed: HashMap::new(),
        }
    }

    fn package_missing(&mut self, package: &'a str) -> bool {
        let overlay = self.overlay;
        !*self
            .installed
            .entry(package)
            .or_insert_with(|| overlay.is_installed(package))
    }

    fn is_damaged(&mut self, component: &'a Component) -> bool {
        self.visit(component).damaged
    }

    fn visit(&mut self, component: &'a Component) -> Visit {
        let key = (component.id(), component.instance());
        if let Some(&damaged) = self.verdicts.get(&key) {
            return Visit {
                damaged,
                provisional: false,
            };
        }
        // Back edge of a child cycle: its answer is still being worked out.
        if !self.in_progress.insert(key) {
            return Visit {
                damaged: false,
                provisional: true,
            };
        }

        let mut damaged = component
            .packages()
            .into_iter()
            .any(|package| self.package_missing(package));
        let mut provisional = false;
        if !damaged {
            for child in component.children() {
                let Some(&target) = self.lookup.get(&(child.id.as_str(), child.instance)) else {
                    continue;
                };
                let visit = self.visit(target);
                provisional |= visit.provisional;
                if visit.damaged {
                    damaged = true;
                    break;
                }
            }
        }
        self.in_progress.remove(&key);

        // Damage is final; a clean answer is only final when nothing above
        // was still undecided.
        if damaged || !provisional {
            self.verdicts.insert(key, damaged);
        }
        Visit {
            damaged,
            provisional: provisional && !damaged,
        }
    }
}

impl PackageOverlay {
    /// Set `isDamaged=TRUE` on every component in `components` that is
    /// damaged, resolving children against `universe` and `components`.
    /// Returns how many were flagged. Existing flags are left alone.
    pub fn flag_broken(&self, components: &mut [Component], universe: &[Component]) -> usize {
        let snapshot = components.to_vec();
        let verdicts: Vec<bool> = {
            let mut check = DamageCheck::new(self, universe, &snapshot);
            snapshot.iter().map(|c| check.is_damaged(c)).collect()
        };

        let mut flagged = 0;
        for (component, damaged) in components.iter_mut().zip(verdicts) {
            if damaged {
                component.set_app_data(DAMAGED_KEY, DAMAGED_VALUE);
                flagged += 1;
            }
        }
        if flagged > 0 {
            info!(flagged, "Flagged damaged components");
        }
        flagged
    }
}
