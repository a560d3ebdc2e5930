//! Component I/O
//!
//! Maps between the registry tag stream and the in-memory component list,
//! short-circuiting re-parses of an unchanged file through the snapshot cache.

pub mod reader;
pub mod snapshot;
pub mod writer;

pub use reader::parse_components;
pub use writer::write_components;

use crate::component::Component;
use crate::error::{RegistryError, Result};
use crate::store::{FileToken, RegistryFiles, XmlFileIo};

/// How a registry read went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Whole file parsed (or no file yet)
    Clean,
    /// Parsing stopped at an error; components before it were kept
    Partial(String),
    /// The file declares a newer format version; nothing was read
    Unsupported(String),
}

/// Components produced by one read.
#[derive(Debug, Clone)]
pub struct ParsedRegistry {
    pub components: Vec<Component>,
    pub outcome: ReadOutcome,
}

impl ParsedRegistry {
    pub fn empty() -> Self {
        Self {
            components: Vec::new(),
            outcome: ReadOutcome::Clean,
        }
    }
}

/// Read the current registry file through the snapshot cache.
pub fn read_registry(io: &XmlFileIo) -> Result<ParsedRegistry> {
    let path = io.files().current();
    let token = FileToken::capture(path);
    if !token.is_present() {
        tracing::debug!(path = %path.display(), "No registry file; starting empty");
        return Ok(ParsedRegistry::empty());
    }

    if let Some(parsed) = snapshot::lookup(&token) {
        tracing::debug!(token = %token, "Registry unchanged since last parse; using snapshot");
        return Ok(parsed);
    }

    let text = match io.read_current()? {
        Some(text) => text,
        None => return Ok(ParsedRegistry::empty()),
    };
    let parsed = parse_components(&text);
    tracing::debug!(
        components = parsed.components.len(),
        outcome = ?parsed.outcome,
        "Parsed registry"
    );

    // Only cache when the file did not change underneath the read.
    if FileToken::capture(path) == token {
        snapshot::store(token, &parsed);
    }
    Ok(parsed)
}

/// Stream `components` into the scratch file of a read-write cycle.
pub fn write_registry(io: &mut XmlFileIo, components: &[Component]) -> Result<()> {
    let scratch = io.files().scratch().to_path_buf();
    let writer = io.writer()?;
    write_components(writer, components).map_err(|e| RegistryError::io(scratch, e))
}

/// Record a just-committed component list as the cached parse of the current file.
pub fn remember_commit(files: &RegistryFiles, components: &[Component]) {
    let token = FileToken::capture(files.current());
    let parsed = ParsedRegistry {
        components: components
            .iter()
            .filter(|c| !c.is_synthetic())
            .cloned()
            .collect(),
        outcome: ReadOutcome::Clean,
    };
    snapshot::store(token, &parsed);
}
