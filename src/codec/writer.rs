//! Component list to tag stream.
//!
//! Consecutive components sharing an id form one `<compid>` block. Inside it,
//! consecutive instances that agree on version, unique name, vendor and
//! display names share one `<compversion>` block where those fields are
//! written once. Element order is fixed so successive commits diff cleanly.

use crate::component::{Component, ComponentRef, RefList};
use crate::store::xml::{Tag, TagWriter};
use crate::types::REGISTRY_VERSION;
use std::io::Write;

fn same_block(a: &Component, b: &Component) -> bool {
    a.version() == b.version()
        && a.unique_name() == b.unique_name()
        && a.vendor() == b.vendor()
        && a.display_names() == b.display_names()
}

/// Serialize `components`. Synthetic components are skipped.
pub fn write_components<W: Write>(
    writer: &mut TagWriter<W>,
    components: &[Component],
) -> std::io::Result<()> {
    let persistent: Vec<&Component> = components.iter().filter(|c| !c.is_synthetic()).collect();

    writer.write_open(Tag::ProductRegistry, None)?;
    writer.write_tag(Tag::Version, REGISTRY_VERSION)?;
    writer.write_open(Tag::Components, None)?;

    for id_group in persistent.chunk_by(|a, b| a.id() == b.id()) {
        writer.write_open(Tag::CompId, Some(id_group[0].id()))?;
        for block in id_group.chunk_by(|a, b| same_block(a, b)) {
            write_version_block(writer, block)?;
        }
        writer.write_close(Tag::CompId)?;
    }

    writer.write_close(Tag::Components)?;
    writer.write_close(Tag::ProductRegistry)?;
    writer.flush()
}

fn write_version_block<W: Write>(
    writer: &mut TagWriter<W>,
    block: &[&Component],
) -> std::io::Result<()> {
    let head = block[0];
    writer.write_open(Tag::CompVersion, head.version())?;
    if let Some(unique_name) = head.unique_name() {
        writer.write_tag(Tag::UniqueName, unique_name)?;
    }
    if !head.display_names().is_empty() {
        writer.write_open(Tag::DisplayName, None)?;
        for (language, name) in head.display_names() {
            writer.write_tag(Tag::Language, language)?;
            writer.write_tag(Tag::LocalizedName, name)?;
        }
        writer.write_close(Tag::DisplayName)?;
    }
    if let Some(vendor) = head.vendor() {
        writer.write_tag(Tag::Vendor, vendor)?;
    }
    for component in block {
        write_instance(writer, component)?;
    }
    writer.write_close(Tag::CompVersion)
}

fn write_instance<W: Write>(writer: &mut TagWriter<W>, component: &Component) -> std::io::Result<()> {
    writer.write_open(Tag::CompInstance, Some(&component.instance().to_string()))?;

    if let Some(parent) = component.parent() {
        writer.write_open(Tag::Parent, None)?;
        write_ref(writer, parent)?;
        writer.write_close(Tag::Parent)?;
    }
    write_ref_list(writer, Tag::Children, component.children())?;
    writer.write_tag(Tag::CompType, component.component_type().as_str())?;
    if let Some(location) = component.location() {
        writer.write_tag(Tag::Location, &location.to_string_lossy())?;
    }
    if let Some(uninstaller) = component.uninstaller() {
        writer.write_tag(Tag::Uninstaller, uninstaller)?;
    }
    if !component.compatible_versions().is_empty() {
        writer.write_open(Tag::Compatible, None)?;
        for version in component.compatible_versions() {
            writer.write_tag(Tag::Version, version)?;
        }
        writer.write_close(Tag::Compatible)?;
    }
    write_ref_list(writer, Tag::Dependent, component.dependents())?;
    write_ref_list(writer, Tag::Required, component.required())?;
    if !component.app_data_pairs().is_empty() {
        writer.write_open(Tag::Data, None)?;
        for (key, value) in component.app_data_pairs() {
            writer.write_tag(Tag::Key, key)?;
            writer.write_tag(Tag::Value, value)?;
        }
        writer.write_close(Tag::Data)?;
    }

    writer.write_close(Tag::CompInstance)
}

fn write_ref_list<W: Write>(writer: &mut TagWriter<W>, tag: Tag, refs: &RefList) -> std::io::Result<()> {
    if refs.is_empty() {
        return Ok(());
    }
    writer.write_open(tag, None)?;
    for reference in refs {
        write_ref(writer, reference)?;
    }
    writer.write_close(tag)
}

fn write_ref<W: Write>(writer: &mut TagWriter<W>, reference: &ComponentRef) -> std::io::Result<()> {
    writer.write_open(Tag::CompRef, Some(&reference.id))?;
    let instance = reference.instance.to_string();
    match &reference.version {
        Some(version) => {
            writer.write_open(Tag::Instance, Some(&instance))?;
            writer.write_tag(Tag::Version, version)?;
            writer.write_close(Tag::Instance)?;
        }
        None => writer.write_tag(Tag::Instance, &instance)?,
    }
    writer.write_close(Tag::CompRef)
}
