//! Path resolution for configuration and registry storage.

pub mod registry_paths;
pub mod xdg_root;
