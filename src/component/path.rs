//! Location canonicalization.
//!
//! A canonical location is absolute, has every symbolic link component
//! resolved, and carries no `.`/`..` segments or repeated separators.
//! Components that do not exist are kept as written, so locations of
//! not-yet-installed software still canonicalize.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Upper bound on symbolic link expansions for one path (loop guard).
const MAX_LINK_HOPS: usize = 40;

enum Part {
    Parent,
    Name(OsString),
}

/// Canonicalize a location. Relative paths are taken against the working directory.
pub fn canonicalize_location(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(e) => {
                tracing::warn!("Cannot read working directory, anchoring {:?} at /: {}", path, e);
                Path::new("/").join(path)
            }
        }
    };
    resolve(&absolute)
}

fn split(path: &Path) -> VecDeque<Part> {
    path.components()
        .filter_map(|component| match component {
            Component::RootDir | Component::Prefix(_) | Component::CurDir => None,
            Component::ParentDir => Some(Part::Parent),
            Component::Normal(name) => Some(Part::Name(name.to_os_string())),
        })
        .collect()
}

fn resolve(path: &Path) -> PathBuf {
    let mut pending = split(path);
    let mut resolved = PathBuf::from("/");
    let mut hops = 0;

    while let Some(part) = pending.pop_front() {
        let name = match part {
            Part::Parent => {
                resolved.pop();
                continue;
            }
            Part::Name(name) => name,
        };

        let candidate = resolved.join(&name);
        if hops < MAX_LINK_HOPS {
            let is_link = std::fs::symlink_metadata(&candidate)
                .map(|meta| meta.file_type().is_symlink())
                .unwrap_or(false);
            if is_link {
                if let Ok(target) = std::fs::read_link(&candidate) {
                    hops += 1;
                    if target.is_absolute() {
                        resolved = PathBuf::from("/");
                    }
                    for part in split(&target).into_iter().rev() {
                        pending.push_front(part);
                    }
                    continue;
                }
            }
        } else {
            tracing::debug!("Symbolic link limit reached while resolving {:?}", path);
        }
        resolved = candidate;
    }

    resolved
}
