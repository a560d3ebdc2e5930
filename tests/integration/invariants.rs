//! Cross-reference invariants under arbitrary register/unregister sequences.

use prodreg::component::path::canonicalize_location;
use prodreg::{AccessMode, Component, ComponentRef, RegistryFiles, RegistrySession};
use proptest::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use tempfile::TempDir;

const IDS: [&str; 3] = ["A", "B", "C"];
const VERSIONS: [&str; 3] = ["1.0", "1.10", "2.0"];

#[derive(Debug, Clone)]
enum Op {
    Register {
        id: usize,
        location: usize,
        version: usize,
        required: Vec<(usize, u32)>,
        children: Vec<(usize, u32)>,
    },
    Unregister(usize),
}

fn refs() -> impl Strategy<Value = Vec<(usize, u32)>> {
    proptest::collection::vec((0..IDS.len(), 1u32..4), 0..3)
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..IDS.len(), 0usize..4, 0..VERSIONS.len(), refs(), refs()).prop_map(
            |(id, location, version, required, children)| Op::Register {
                id,
                location,
                version,
                required,
                children,
            }
        ),
        1 => any::<usize>().prop_map(Op::Unregister),
    ]
}

fn apply(session: &mut RegistrySession, op: &Op) {
    match op {
        Op::Register {
            id,
            location,
            version,
            required,
            children,
        } => {
            let mut c = Component::new(IDS[*id]);
            c.set_version(Some(VERSIONS[*version]));
            c.set_location(Some(Path::new(&format!(
                "/nonexistent-prodreg-inv/{}",
                location
            ))));
            for (target, instance) in required {
                c.add_required(ComponentRef::new(IDS[*target], *instance, None));
            }
            for (target, instance) in children {
                c.add_child(ComponentRef::new(IDS[*target], *instance, None));
            }
            session.register_component(&c).unwrap();
        }
        Op::Unregister(pick) => {
            let all = session.get_all_components();
            if all.is_empty() {
                return;
            }
            let target = all[pick % all.len()].clone();
            session.unregister_component(&target).unwrap();
        }
    }
}

fn find<'a>(all: &'a [Component], reference: &ComponentRef) -> Option<&'a Component> {
    all.iter().find(|c| c.is(&reference.id, reference.instance))
}

fn check(all: &[Component]) -> Result<(), TestCaseError> {
    // (id, location) unique; (id, instance) unique
    let mut locations = HashSet::new();
    let mut instances = HashSet::new();
    for c in all {
        prop_assert!(locations.insert((c.id().to_string(), c.location().map(Path::to_path_buf))));
        prop_assert!(c.instance() >= 1);
        prop_assert!(instances.insert((c.id().to_string(), c.instance())));
        if let Some(location) = c.location() {
            prop_assert_eq!(canonicalize_location(location), location.to_path_buf());
        }
    }

    // Grouped by id, ordered by version then instance inside a group.
    let mut seen_ids: Vec<&str> = Vec::new();
    for pair in all.windows(2) {
        if pair[0].id() == pair[1].id() {
            let ordering = prodreg::component::version::compare_optional_versions(
                pair[0].version(),
                pair[1].version(),
            )
            .then(pair[0].instance().cmp(&pair[1].instance()));
            prop_assert_eq!(ordering, std::cmp::Ordering::Less);
        }
    }
    for c in all {
        if seen_ids.last() != Some(&c.id()) {
            prop_assert!(!seen_ids.contains(&c.id()), "id {} split", c.id());
            seen_ids.push(c.id());
        }
    }

    for c in all {
        // Required targets list c as a dependent.
        for r in c.required() {
            if let Some(target) = find(all, r) {
                prop_assert!(target.dependents().contains(c.id(), c.instance()));
            }
        }
        // Dependents are present and require c.
        for d in c.dependents() {
            let dependent = find(all, d);
            prop_assert!(dependent.is_some_and(|d| d.required().contains(c.id(), c.instance())));
        }
        // A parent is present and lists c as a child.
        if let Some(p) = c.parent() {
            let parent = find(all, p);
            prop_assert!(parent.is_some_and(|p| p.children().contains(c.id(), c.instance())));
        }
        // A listed child has no parent or one that claims it.
        for r in c.children() {
            if let Some(child) = find(all, r) {
                if let Some(p) = child.parent() {
                    let claimant = find(all, p);
                    prop_assert!(claimant.is_some_and(|p| p.children().contains(child.id(), child.instance())));
                }
            }
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn invariants_hold_after_every_mutation(ops in proptest::collection::vec(op(), 1..24)) {
        let temp_dir = TempDir::new().unwrap();
        let mut session =
            RegistrySession::open(RegistryFiles::new(temp_dir.path()), AccessMode::ReadWrite).unwrap();
        for op in &ops {
            apply(&mut session, op);
            check(session.get_all_components())?;
        }
    }

    #[test]
    fn register_then_unregister_restores_the_set(
        setup in proptest::collection::vec(op(), 0..10),
        required in refs(),
        children in refs(),
    ) {
        let temp_dir = TempDir::new().unwrap();
        let mut session =
            RegistrySession::open(RegistryFiles::new(temp_dir.path()), AccessMode::ReadWrite).unwrap();
        for op in &setup {
            apply(&mut session, op);
        }
        let before = session.get_all_components().to_vec();

        let mut fresh = Component::new("fresh");
        fresh.set_location(Some(Path::new("/nonexistent-prodreg-inv/fresh")));
        for (target, instance) in &required {
            fresh.add_required(ComponentRef::new(IDS[*target], *instance, None));
        }
        for (target, instance) in &children {
            fresh.add_child(ComponentRef::new(IDS[*target], *instance, None));
        }
        let instance = session.register_component(&fresh).unwrap();
        fresh.set_instance(instance);
        let stored = session
            .get_all_components()
            .iter()
            .find(|c| c.is("fresh", instance))
            .cloned()
            .unwrap();
        session.unregister_component(&stored).unwrap();

        prop_assert_eq!(session.get_all_components(), before.as_slice());
    }
}
