//! Deterministic ordering of project files
//!
//! `project.json` comes first, numbered assets follow in numeric order
//! (`2.png` before `10.png`), and everything else falls back to a byte-wise
//! comparison. Identical inputs in any order sort to the same list, which keeps
//! assembled archives byte-stable.

use crate::types::ProjectFile;
use std::cmp::Ordering;

/// Path of the manifest inside a multi-file project
pub const MANIFEST_PATH: &str = "project.json";

/// Sort files in place (stable)
pub fn sort_files(files: &mut [ProjectFile]) {
    files.sort_by(|a, b| compare_paths(&a.path, &b.path));
}

/// Ordering used by [`sort_files`]
pub fn compare_paths(a: &str, b: &str) -> Ordering {
    match (a == MANIFEST_PATH, b == MANIFEST_PATH) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }

    numeric_prefix(a)
        .total_cmp(&numeric_prefix(b))
        .then_with(|| a.cmp(b))
}

/// Number before the first `.` of a path, or 0 if it is not a finite number
pub fn numeric_prefix(path: &str) -> f64 {
    let stem = path.split('.').next().unwrap_or(path).trim();
    stem.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}
