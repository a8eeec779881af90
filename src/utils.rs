//! Utility functions for file naming and path manipulation

use crate::config::FileCollisionAction;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Characters that may not appear in a saved project's file name
const FORBIDDEN_TITLE_CHARS: [char; 10] = ['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>'];

/// Make a project title safe to use as a file name
///
/// Every path separator and shell/wildcard character is replaced with `-`.
///
/// # Examples
///
/// ```
/// use scratch_dl::utils::sanitize_title;
///
/// assert_eq!(sanitize_title("Pong: 2/3 players?"), "Pong- 2-3 players-");
/// ```
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if FORBIDDEN_TITLE_CHARS.contains(&c) {
                '-'
            } else {
                c
            }
        })
        .collect()
}

/// Get the path to write a file to, handling collisions according to `action`
///
/// # Returns
///
/// - `Overwrite`: always the original path
/// - `Skip`: the original path, or `None` if a file is already there
/// - `Rename`: the original path if free, else the first free `name (N).ext`
///
/// # Examples
///
/// ```no_run
/// use scratch_dl::utils::get_unique_path;
/// use scratch_dl::config::FileCollisionAction;
/// use std::path::Path;
///
/// let path = Path::new("/tmp/Pong.sb3");
/// let unique = get_unique_path(path, FileCollisionAction::Rename).unwrap();
/// // If /tmp/Pong.sb3 exists, returns /tmp/Pong (1).sb3
/// ```
pub fn get_unique_path(path: &Path, action: FileCollisionAction) -> Result<Option<PathBuf>> {
    match action {
        FileCollisionAction::Overwrite => Ok(Some(path.to_path_buf())),
        FileCollisionAction::Skip => {
            if path.exists() {
                Ok(None)
            } else {
                Ok(Some(path.to_path_buf()))
            }
        }
        FileCollisionAction::Rename => {
            if !path.exists() {
                return Ok(Some(path.to_path_buf()));
            }

            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| Error::Other(format!("Cannot extract file stem: {}", path.display())))?;

            let extension = path.extension().and_then(|e| e.to_str());

            let parent = path.parent().ok_or_else(|| {
                Error::Other(format!(
                    "Cannot extract parent directory: {}",
                    path.display()
                ))
            })?;

            // Try adding (1), (2), (3), ... until we find a unique name
            for i in 1..=MAX_RENAME_ATTEMPTS {
                let new_name = match extension {
                    Some(ext) => format!("{} ({}).{}", stem, i, ext),
                    None => format!("{} ({})", stem, i),
                };
                let new_path = parent.join(new_name);
                if !new_path.exists() {
                    return Ok(Some(new_path));
                }
            }

            Err(Error::Other(format!(
                "Could not find unique filename for {} after {} attempts",
                path.display(),
                MAX_RENAME_ATTEMPTS
            )))
        }
    }
}
