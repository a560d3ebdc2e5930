use super::support::{component, reference, registry_in};
use prodreg::{AccessMode, Query, ReadOutcome, RegistryError};
use std::fs;
use tempfile::TempDir;

#[test]
fn empty_registry_yields_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_in(&temp_dir);
    assert!(registry.get_all().unwrap().is_empty());
}

#[test]
fn register_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_in(&temp_dir);

    let mut a = component("A", "1.0", "/opt/a");
    a.add_required(reference("B", 1));
    assert_eq!(registry.register(&a).unwrap(), 1);

    let first = registry.query(&Query::new().with_id("A")).unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].instance(), 1);
    assert!(first[0].dependents().is_empty());

    let reopened = registry_in(&temp_dir);
    let second = reopened.query(&Query::new().with_id("A")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn reregister_withdraws_dropped_dependents() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_in(&temp_dir);

    registry.register(&component("B", "1.0", "/opt/b")).unwrap();
    let mut a = component("A", "1.0", "/opt/a");
    a.add_required(reference("B", 1));
    registry.register(&a).unwrap();
    let b = registry.get(&Query::new().with_id("B")).unwrap();
    assert!(b.dependents().contains("A", 1));

    registry.register(&component("A", "1.0", "/opt/a")).unwrap();
    let b = registry.get(&Query::new().with_id("B")).unwrap();
    assert!(b.dependents().is_empty());
}

#[test]
fn instances_follow_highest_existing() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_in(&temp_dir);

    assert_eq!(registry.register(&component("X", "1.0", "/a")).unwrap(), 1);
    assert_eq!(registry.register(&component("X", "1.0", "/b")).unwrap(), 2);

    let first = registry
        .get(&Query::new().with_id("X").with_instance(1))
        .unwrap();
    registry.unregister(&first).unwrap();
    assert_eq!(registry.register(&component("X", "1.0", "/c")).unwrap(), 3);

    let instances: Vec<u32> = registry
        .query(&Query::new().with_id("X"))
        .unwrap()
        .iter()
        .map(|c| c.instance())
        .collect();
    assert_eq!(instances, vec![2, 3]);
}

#[test]
fn newer_format_refuses_mutation_and_is_never_rewritten() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_in(&temp_dir);
    fs::create_dir_all(registry.files().dir()).unwrap();
    let text = "<productregistry>\n  <version>9.9</version>\n  <components>\n    \
                <compid>A\n      <compversion>1.0\n        <compinstance>1\n        \
                </compinstance>\n      </compversion>\n    </compid>\n  </components>\n\
                </productregistry>\n";
    fs::write(registry.files().current(), text).unwrap();

    let mut session = registry.open(AccessMode::ReadWrite).unwrap();
    assert!(session.get_all_components().is_empty());
    assert!(matches!(session.read_outcome(), ReadOutcome::Unsupported(v) if v == "9.9"));
    assert!(matches!(
        session.register_component(&component("B", "1.0", "/opt/b")),
        Err(RegistryError::VersionUnsupported { found, supported })
            if found == "9.9" && supported == "0.8"
    ));
    assert!(!session.close().unwrap());

    assert_eq!(fs::read_to_string(registry.files().current()).unwrap(), text);
    assert!(!registry.files().backup().exists());
    assert!(!registry.files().scratch().exists());
}

#[test]
fn display_names_round_trip_as_a_set() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_in(&temp_dir);

    let mut a = component("A", "1.0", "/opt/a");
    a.add_display_name("en", "Hello");
    a.add_display_name("fr", "Bonjour");
    registry.register(&a).unwrap();

    let stored = registry.get(&Query::new().with_id("A")).unwrap();
    let mut languages = stored.display_languages();
    languages.sort();
    assert_eq!(languages, vec!["en", "fr"]);
    assert_eq!(stored.display_name("en"), Some("Hello"));
    assert_eq!(stored.display_name("fr"), Some("Bonjour"));

    let mut reordered = component("A", "1.0", "/opt/a");
    reordered.set_instance(1);
    reordered.add_display_name("fr", "Bonjour");
    reordered.add_display_name("en", "Hello");
    assert_eq!(stored, reordered);
}

#[cfg(unix)]
#[test]
fn commit_through_symlink_to_backup() {
    use std::os::unix::fs::symlink;

    let temp_dir = TempDir::new().unwrap();
    let registry = registry_in(&temp_dir);
    registry.register(&component("A", "1.0", "/opt/a")).unwrap();

    // current -> backup, the way some installs leave it after a manual restore.
    let files = registry.files();
    fs::rename(files.current(), files.backup()).unwrap();
    symlink(files.backup(), files.current()).unwrap();
    let before = fs::read_to_string(files.backup()).unwrap();

    let real = temp_dir.path().join("real");
    fs::create_dir_all(&real).unwrap();
    let link = temp_dir.path().join("link");
    symlink(&real, &link).unwrap();
    let b = component("B", "1.0", &link.join("..").join("link").to_string_lossy());
    assert_eq!(
        b.location().unwrap(),
        prodreg::component::path::canonicalize_location(&real)
    );
    registry.register(&b).unwrap();

    assert!(!fs::symlink_metadata(files.current()).unwrap().file_type().is_symlink());
    assert_eq!(fs::read_to_string(files.backup()).unwrap(), before);
    let ids: Vec<String> = registry
        .get_all()
        .unwrap()
        .iter()
        .map(|c| c.id().to_string())
        .collect();
    assert_eq!(ids, vec!["A", "B"]);
}

#[test]
fn backup_holds_previous_commit() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_in(&temp_dir);
    registry.register(&component("A", "1.0", "/opt/a")).unwrap();
    let first = fs::read_to_string(registry.files().current()).unwrap();

    registry.register(&component("B", "1.0", "/opt/b")).unwrap();
    assert_eq!(fs::read_to_string(registry.files().backup()).unwrap(), first);
    assert!(!registry.files().scratch().exists());
}

#[test]
fn malformed_tail_keeps_leading_components() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_in(&temp_dir);
    fs::create_dir_all(registry.files().dir()).unwrap();
    fs::write(
        registry.files().current(),
        "<productregistry><version>0.8</version><components>\
         <compid>A<compversion>1.0<compinstance>1<location>/opt/a</location>\
         </compinstance></compversion></compid>\
         <compid>B<bogus>",
    )
    .unwrap();

    let session = registry.open(AccessMode::Read).unwrap();
    assert!(matches!(session.read_outcome(), ReadOutcome::Partial(_)));
    assert_eq!(session.get_all_components().len(), 1);
    assert_eq!(session.get_all_components()[0].id(), "A");
}

#[test]
fn unregister_clears_parent_of_children() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_in(&temp_dir);
    registry.register(&component("C", "1.0", "/opt/c")).unwrap();
    let mut p = component("P", "1.0", "/opt/p");
    p.add_child(reference("C", 1));
    registry.register(&p).unwrap();
    assert!(registry
        .get(&Query::new().with_id("C"))
        .unwrap()
        .parent()
        .is_some());

    let p = registry.get(&Query::new().with_id("P")).unwrap();
    registry.unregister(&p).unwrap();
    let c = registry.get(&Query::new().with_id("C")).unwrap();
    assert!(c.parent().is_none());
}

#[test]
fn unresolved_reference_is_refused_and_file_stays_readable() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_in(&temp_dir);

    let mut a = component("A", "1.0", "/opt/a");
    a.add_required(reference("B", 0));
    assert!(matches!(
        registry.register(&a),
        Err(RegistryError::InstanceUnresolvable { .. })
    ));
    registry.register(&component("C", "1.0", "/opt/c")).unwrap();

    let session = registry.open(AccessMode::Read).unwrap();
    assert_eq!(session.read_outcome(), &ReadOutcome::Clean);
    let ids: Vec<&str> = session.get_all_components().iter().map(|c| c.id()).collect();
    assert_eq!(ids, vec!["C"]);
}

#[test]
fn blank_keys_and_languages_never_reach_the_file() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_in(&temp_dir);

    let mut a = component("A", "1.0", "/opt/a");
    a.set_app_data("  ", "v");
    a.set_app_data("kept", "");
    a.add_display_name("", "Nameless");
    a.add_display_name("en", "");
    registry.register(&a).unwrap();
    registry.register(&component("B", "1.0", "/opt/b")).unwrap();

    let session = registry.open(AccessMode::Read).unwrap();
    assert_eq!(session.read_outcome(), &ReadOutcome::Clean);
    assert_eq!(session.get_all_components().len(), 2);
    let stored = session.get(&Query::new().with_id("A")).unwrap();
    assert_eq!(stored.app_data_pairs(), &[("kept".to_string(), String::new())]);
    assert_eq!(stored.display_languages(), vec!["en"]);
}

#[test]
fn unregistered_parent_is_not_stored() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_in(&temp_dir);

    let mut c = component("C", "1.0", "/opt/c");
    c.set_parent(Some(reference("Ghost", 7)));
    registry.register(&c).unwrap();
    assert!(registry
        .get(&Query::new().with_id("C"))
        .unwrap()
        .parent()
        .is_none());
}

#[test]
fn latin1_display_name_reads_cleanly() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_in(&temp_dir);
    fs::create_dir_all(registry.files().dir()).unwrap();
    let mut text = b"<productregistry><version>0.8</version><components>\
<compid>A<compversion>1.0<displayname><language>fr</language>\
<localizedname>Fran"
        .to_vec();
    text.push(0xe7);
    text.extend_from_slice(
        b"ais</localizedname></displayname><compinstance>1<location>/opt/a</location>\
</compinstance></compversion></compid></components></productregistry>",
    );
    fs::write(registry.files().current(), text).unwrap();

    let session = registry.open(AccessMode::Read).unwrap();
    assert_eq!(session.read_outcome(), &ReadOutcome::Clean);
    let stored = session.get(&Query::new().with_id("A")).unwrap();
    assert_eq!(stored.display_name("fr"), Some("Fran\u{fffd}ais"));
}
