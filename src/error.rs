//! Error types for the product registry.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Query or unregister target absent from the component set
    #[error("Component not found: {0}")]
    NotFound(String),

    /// Malformed registry file or unknown tag
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// On-disk format version newer than this reader supports
    #[error("Unsupported registry version {found} (supported: {supported})")]
    VersionUnsupported { found: String, supported: String },

    /// Registry file set could not be opened, read, written or renamed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reference add where no instance could be determined
    #[error("Cannot resolve instance for reference to {id} at {location}")]
    InstanceUnresolvable { id: String, location: String },

    /// Component the registry file cannot represent (blank id or reference id)
    #[error("Invalid component: {0}")]
    InvalidComponent(String),

    /// Mutation attempted on a session that may not write
    #[error("Registry session is read-only: {0}")]
    ReadOnly(String),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RegistryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RegistryError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<config::ConfigError> for RegistryError {
    fn from(err: config::ConfigError) -> Self {
        RegistryError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
