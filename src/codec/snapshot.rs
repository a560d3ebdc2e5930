//! Process-wide cache of the last parsed registry.
//!
//! One slot per registry file path (an alternate root gets its own slot),
//! holding the [`FileToken`] the parse came from. A hit hands out a deep
//! clone, so callers never share components with the cache.

use super::ParsedRegistry;
use crate::store::FileToken;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

struct Snapshot {
    token: FileToken,
    parsed: ParsedRegistry,
}

fn cache() -> &'static Mutex<HashMap<PathBuf, Snapshot>> {
    static CACHE: OnceLock<Mutex<HashMap<PathBuf, Snapshot>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Clone of the cached parse if `token` matches the one stored for its path.
pub fn lookup(token: &FileToken) -> Option<ParsedRegistry> {
    if !token.is_present() {
        return None;
    }
    let guard = cache().lock();
    guard
        .get(token.path())
        .filter(|snapshot| snapshot.token == *token)
        .map(|snapshot| snapshot.parsed.clone())
}

/// Remember `parsed` as the contents of the file described by `token`.
pub fn store(token: FileToken, parsed: &ParsedRegistry) {
    if !token.is_present() {
        invalidate(token.path());
        return;
    }
    cache().lock().insert(
        token.path().to_path_buf(),
        Snapshot {
            token,
            parsed: parsed.clone(),
        },
    );
}

/// Forget the cached parse for `path`.
pub fn invalidate(path: &Path) {
    cache().lock().remove(path);
}
