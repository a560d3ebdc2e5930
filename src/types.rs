//! Core types shared across the registry.

use serde::{Deserialize, Serialize};

/// Instance: disambiguating number among components sharing an id (always >= 1)
pub type Instance = u32;

/// On-disk format version written by this crate and the newest one it reads.
pub const REGISTRY_VERSION: &str = "0.8";

/// Access mode for a registry session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    /// Parse the current file only; mutations are refused
    Read,
    /// Parse the current file and commit through the atomic swap on close
    ReadWrite,
}

impl AccessMode {
    pub fn is_writable(self) -> bool {
        matches!(self, AccessMode::ReadWrite)
    }
}
