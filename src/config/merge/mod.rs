//! Source composition for [`RegistryConfig`](crate::config::RegistryConfig).

pub mod service;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder};

/// Empty builder; field defaults live on the serde structs so a missing key
/// anywhere falls back the same way.
pub(crate) fn builder_with_defaults() -> ConfigBuilder<DefaultState> {
    Config::builder()
}
