use prodreg::{Component, ComponentRef, ProductRegistry, RegistryFiles};
use std::path::Path;
use tempfile::TempDir;

/// Registry under `<temp>/install` with packages under `<temp>/pkg`.
pub fn registry_in(temp_dir: &TempDir) -> ProductRegistry {
    ProductRegistry::with_paths(
        RegistryFiles::new(temp_dir.path().join("install")),
        temp_dir.path().join("pkg"),
        "5.10",
    )
}

pub fn component(id: &str, version: &str, location: &str) -> Component {
    let mut c = Component::new(id);
    c.set_version(Some(version));
    c.set_location(Some(Path::new(location)));
    c
}

pub fn reference(id: &str, instance: u32) -> ComponentRef {
    ComponentRef::new(id, instance, None)
}

pub fn install_package(pkg_dir: &Path, package: &str, category: &str) {
    let dir = pkg_dir.join(package);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("pkginfo"),
        format!(
            "PKG={}\nNAME=\"{} package\"\nVERSION=1.0\nCATEGORY={}\nBASEDIR=/\n",
            package, package, category
        ),
    )
    .unwrap();
}
