//! The on-disk format reproduces any well-formed component set.

use prodreg::codec::{parse_components, write_components, ReadOutcome};
use prodreg::store::TagWriter;
use prodreg::{Component, ComponentRef, ComponentType};
use proptest::prelude::*;
use std::path::Path;

fn text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9 &<>._-]{0,10}[A-Za-z0-9]"
}

fn component_type() -> impl Strategy<Value = ComponentType> {
    prop_oneof![
        Just(ComponentType::Product),
        Just(ComponentType::Feature),
        Just(ComponentType::Component),
    ]
}

fn reference() -> impl Strategy<Value = ComponentRef> {
    ("[A-Z]{1,3}", 1u32..5, proptest::option::of("[0-9]\\.[0-9]"))
        .prop_map(|(id, instance, version)| ComponentRef::new(&id, instance, version.as_deref()))
}

#[derive(Debug, Clone)]
struct Fields {
    id: String,
    version: Option<String>,
    unique_name: Option<String>,
    vendor: Option<String>,
    names: Vec<(String, String)>,
    component_type: ComponentType,
    location: Option<String>,
    uninstaller: Option<String>,
    compatible: Vec<String>,
    parent: Option<ComponentRef>,
    children: Vec<ComponentRef>,
    required: Vec<ComponentRef>,
    dependents: Vec<ComponentRef>,
    data: Vec<(String, String)>,
}

fn fields() -> impl Strategy<Value = Fields> {
    let scalars = (
        "[A-Z]{1,3}",
        proptest::option::of("[0-9]{1,2}\\.[0-9]{1,2}"),
        proptest::option::of(text()),
        proptest::option::of(text()),
        proptest::collection::vec(("[a-z]{2}", text()), 0..3),
        component_type(),
        proptest::option::of("[a-z]{1,6}"),
        proptest::option::of(text()),
    );
    let lists = (
        proptest::collection::vec("[0-9]\\.[0-9]", 0..3),
        proptest::option::of(reference()),
        proptest::collection::vec(reference(), 0..3),
        proptest::collection::vec(reference(), 0..3),
        proptest::collection::vec(reference(), 0..3),
        proptest::collection::vec(("[a-z]{1,6}", text()), 0..3),
    );
    (scalars, lists).prop_map(
        |(
            (id, version, unique_name, vendor, names, component_type, location, uninstaller),
            (compatible, parent, children, required, dependents, data),
        )| Fields {
            id,
            version,
            unique_name,
            vendor,
            names,
            component_type,
            location,
            uninstaller,
            compatible,
            parent,
            children,
            required,
            dependents,
            data,
        },
    )
}

fn build(all: Vec<Fields>) -> Vec<Component> {
    let mut components: Vec<Component> = Vec::new();
    for f in all {
        let mut c = Component::new(&f.id);
        // Unique (id, instance) in list order.
        let instance = components.iter().filter(|c| c.id() == f.id).count() as u32 + 1;
        c.set_instance(instance);
        c.set_version(f.version.as_deref());
        c.set_unique_name(f.unique_name.as_deref());
        c.set_vendor(f.vendor.as_deref());
        for (language, name) in &f.names {
            c.add_display_name(language, name);
        }
        c.set_component_type(f.component_type);
        if let Some(location) = &f.location {
            c.set_location(Some(Path::new(&format!("/nonexistent-prodreg-rt/{}", location))));
        }
        c.set_uninstaller(f.uninstaller.as_deref());
        for version in &f.compatible {
            c.add_compatible_version(version);
        }
        c.set_parent(f.parent);
        for r in f.children {
            c.add_child(r);
        }
        for r in f.required {
            c.add_required(r);
        }
        for r in f.dependents {
            c.add_dependent(r);
        }
        for (key, value) in &f.data {
            c.set_app_data(key, value);
        }
        components.push(c);
    }
    components
}

fn render(components: &[Component]) -> String {
    let mut writer = TagWriter::new(Vec::new());
    write_components(&mut writer, components).unwrap();
    String::from_utf8(writer.into_inner()).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn read_of_write_is_identity(all in proptest::collection::vec(fields(), 0..8)) {
        let components = build(all);
        let parsed = parse_components(&render(&components));
        prop_assert_eq!(parsed.outcome, ReadOutcome::Clean);
        prop_assert_eq!(parsed.components, components);
    }

    #[test]
    fn serialization_is_stable(all in proptest::collection::vec(fields(), 0..8)) {
        let components = build(all);
        let first = render(&components);
        let second = render(&parse_components(&first).components);
        prop_assert_eq!(first, second);
    }
}
