//! Prodreg: Product Install Registry
//!
//! A persistent catalog of installed software components kept in a small XML
//! dialect. Components carry versions, locations, localized names, application
//! data and parent/child/required/dependent relationships; the registry keeps
//! those cross-references consistent on every mutation and commits through an
//! atomic three-file swap (current, backup, scratch).
//!
//! ```no_run
//! use prodreg::{Component, ProductRegistry, Query, RegistryConfig};
//! use std::path::Path;
//!
//! # fn main() -> prodreg::Result<()> {
//! let registry = ProductRegistry::new(&RegistryConfig::default());
//! let mut component = Component::new("SUNWexample");
//! component.set_version(Some("1.0"));
//! component.set_location(Some(Path::new("/opt/example")));
//! let instance = registry.register(&component)?;
//! let stored = registry.get(&Query::new().with_id("SUNWexample").with_instance(instance))?;
//! # let _ = stored;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod component;
pub mod config;
pub mod error;
pub mod logging;
pub mod overlay;
pub mod registry;
pub mod store;
pub mod types;

pub use codec::ReadOutcome;
pub use component::{Component, ComponentRef, ComponentType, RefList};
pub use config::{ConfigLoader, RegistryConfig};
pub use error::{RegistryError, Result};
pub use overlay::PackageOverlay;
pub use registry::{ProductRegistry, Query, RegistrySession};
pub use store::RegistryFiles;
pub use types::{AccessMode, Instance};
