//! Environment variable source: PRODREG_* prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

/// Add environment variable overlay to builder.
///
/// `PRODREG_REGISTRY_DIR=/x` sets `registry_dir`; nested keys use `__`, as in
/// `PRODREG_LOGGING__LEVEL=debug`. Values stay strings and are converted on
/// deserialization, so a release like `5.10` is not read as a float.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("PRODREG")
            .prefix_separator("_")
            .separator("__"),
    )
}
