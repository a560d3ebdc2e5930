//! Global config file source: `$XDG_CONFIG_HOME/prodreg/config.toml`, optional.

use crate::config::paths::xdg_root;
use config::builder::DefaultState;
use config::{ConfigBuilder, File};

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    match xdg_root::global_config_path() {
        Some(path) => builder.add_source(File::from(path.as_path()).required(false)),
        None => builder,
    }
}
