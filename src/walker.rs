//! Local directory enumeration
//!
//! Lists every regular file under the deployment root in a stable order.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every regular file under `root`, sorted by name within each directory.
///
/// Symlinks are not followed. Any traversal error aborts the walk.
pub fn walk(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::InvalidPath(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            tracing::error!("Error walking {}: {}", root.display(), e);
            e
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    tracing::debug!("Found {} files under {}", files.len(), root.display());
    Ok(files)
}
