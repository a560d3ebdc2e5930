//! File content signatures.
//!
//! A [`FileToken`] is a cheap stand-in for "has this file changed since we last
//! parsed it": path, size, modification time and inode. Two tokens captured
//! from the same unchanged file compare equal. A rename-based commit always
//! produces a new inode, so a committed rewrite never matches an old token.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Content signature of a file, or a marker that it was not present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileToken {
    NotPresent {
        path: PathBuf,
    },
    Present {
        path: PathBuf,
        size: u64,
        modified: Option<SystemTime>,
        device: u64,
        inode: u64,
    },
}

impl FileToken {
    /// Stat `path`. Never fails: an absent or unreadable path yields `NotPresent`.
    pub fn capture(path: &Path) -> Self {
        let path = path.to_path_buf();
        match std::fs::metadata(&path) {
            Ok(meta) => {
                let (device, inode) = identity(&meta);
                FileToken::Present {
                    size: meta.len(),
                    modified: meta.modified().ok(),
                    device,
                    inode,
                    path,
                }
            }
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!("Treating unreadable {} as absent: {}", path.display(), e);
                }
                FileToken::NotPresent { path }
            }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            FileToken::NotPresent { path } | FileToken::Present { path, .. } => path,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, FileToken::Present { .. })
    }
}

#[cfg(unix)]
fn identity(meta: &std::fs::Metadata) -> (u64, u64) {
    use std::os::unix::fs::MetadataExt;
    (meta.dev(), meta.ino())
}

#[cfg(not(unix))]
fn identity(_meta: &std::fs::Metadata) -> (u64, u64) {
    (0, 0)
}

impl std::fmt::Display for FileToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileToken::NotPresent { path } => write!(f, "{} (absent)", path.display()),
            FileToken::Present {
                path,
                size,
                modified,
                inode,
                ..
            } => {
                let modified = modified
                    .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
                    .unwrap_or_else(|| "unknown".to_string());
                write!(
                    f,
                    "{} ({} bytes, modified {}, inode {})",
                    path.display(),
                    size,
                    modified,
                    inode
                )
            }
        }
    }
}
