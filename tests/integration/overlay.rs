//! Package database overlay through the registry handle.

use super::support::{component, install_package, registry_in};
use prodreg::component::{DAMAGED_KEY, PKGS_KEY};
use prodreg::Query;
use tempfile::TempDir;

#[test]
fn unregistered_packages_surface_under_roots() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_in(&temp_dir);
    let pkg_dir = registry.overlay().pkg_dir().to_path_buf();
    install_package(&pkg_dir, "SUNWcsr", "system");
    install_package(&pkg_dir, "SUNWowned", "application");
    install_package(&pkg_dir, "SUNWtool", "application");

    let mut product = component("product", "1.0", "/opt/product");
    product.set_app_data(PKGS_KEY, "SUNWowned");
    registry.register(&product).unwrap();

    let mut percentages = Vec::new();
    let synthetic = registry.get_sys_pkgs(|p| percentages.push(p)).unwrap();
    assert_eq!(percentages.last(), Some(&100));
    assert!(synthetic.iter().all(|c| c.is_synthetic() && c.instance() == 1));

    let ids: Vec<&str> = synthetic.iter().map(|c| c.id()).collect();
    assert!(ids.contains(&"SUNWcsr"));
    assert!(ids.contains(&"SUNWtool"));
    assert!(!ids.contains(&"SUNWowned"));

    let tool = synthetic.iter().find(|c| c.id() == "SUNWtool").unwrap();
    assert_eq!(tool.parent().map(|p| p.id.as_str()), Some("additional-software"));
    assert_eq!(tool.display_name("en"), Some("SUNWtool package"));
    assert_eq!(tool.version(), Some("1.0"));
}

#[test]
fn synthetic_components_are_never_persisted() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_in(&temp_dir);
    let pkg_dir = registry.overlay().pkg_dir().to_path_buf();
    install_package(&pkg_dir, "SUNWcsr", "system");

    let synthetic = registry.get_sys_pkgs(|_| {}).unwrap();
    let mut session = registry.open(prodreg::AccessMode::ReadWrite).unwrap();
    session
        .register_component(&component("real", "1.0", "/opt/real"))
        .unwrap();
    session.close().unwrap();

    let text = std::fs::read_to_string(registry.files().current()).unwrap();
    assert!(!text.contains("SUNWcsr"));
    assert!(synthetic.iter().any(|c| c.id() == "SUNWcsr"));
}

#[test]
fn removed_packages_flag_components_damaged() {
    let temp_dir = TempDir::new().unwrap();
    let registry = registry_in(&temp_dir);
    let pkg_dir = registry.overlay().pkg_dir().to_path_buf();
    install_package(&pkg_dir, "SUNWpart", "application");

    let mut feature = component("feature", "1.0", "/opt/feature");
    feature.set_app_data(PKGS_KEY, "SUNWpart SUNWremoved");
    registry.register(&feature).unwrap();
    let mut product = component("product", "1.0", "/opt/product");
    product.set_app_data(PKGS_KEY, "SUNWpart");
    product.add_child(prodreg::ComponentRef::new("feature", 1, None));
    registry.register(&product).unwrap();
    let healthy = component("healthy", "1.0", "/opt/healthy");
    registry.register(&healthy).unwrap();

    let mut all = registry.get_all().unwrap();
    assert_eq!(registry.flag_broken(&mut all).unwrap(), 2);
    let flag = |id: &str| {
        all.iter()
            .find(|c| c.id() == id)
            .and_then(|c| c.app_data(DAMAGED_KEY))
            .map(str::to_string)
    };
    assert_eq!(flag("feature").as_deref(), Some("TRUE"));
    assert_eq!(flag("product").as_deref(), Some("TRUE"));
    assert_eq!(flag("healthy"), None);

    // Flagging works on copies; the stored records are untouched.
    let stored = registry.get(&Query::new().with_id("feature")).unwrap();
    assert_eq!(stored.app_data(DAMAGED_KEY), None);
}
