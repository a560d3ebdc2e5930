//! Version ordering for component versions.
//!
//! Versions compare segment by segment on `.`. Two numeric segments compare
//! numerically, anything else compares byte-wise. Surrounding whitespace is
//! ignored, and a version that is a strict prefix of another sorts first.

use std::cmp::Ordering;

/// Compare two version strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.trim().split('.');
    let mut right = b.trim().split('.');

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ordering = compare_segment(l.trim(), r.trim());
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

/// Compare optional versions; an absent version sorts before any present one.
pub fn compare_optional_versions(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_versions(a, b),
    }
}

fn compare_segment(l: &str, r: &str) -> Ordering {
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if numeric(l) && numeric(r) {
        let l = l.trim_start_matches('0');
        let r = r.trim_start_matches('0');
        // Equal-length digit strings compare correctly byte-wise, and avoid overflow.
        l.len().cmp(&r.len()).then_with(|| l.cmp(r))
    } else {
        l.as_bytes().cmp(r.as_bytes())
    }
}
