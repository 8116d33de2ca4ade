//! Builds a [`FileItem`] selection from command-line paths.

use super::types::FileItem;
use crate::error::PhotoTrailsError;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Extensions picked up when a directory is uploaded.
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "heic", "heif", "webp", "tif", "tiff", "dng", "mp4", "mov", "m4v", "avi",
    "mkv", "3gp",
];

pub fn is_media_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MEDIA_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expand `paths` into files, in argument order.
///
/// Named files are taken as-is; directories are walked recursively in sorted
/// order and filtered to [`MEDIA_EXTENSIONS`].
pub fn collect_files(paths: &[PathBuf]) -> Result<Vec<FileItem>, PhotoTrailsError> {
    let mut items = Vec::new();

    for path in paths {
        let metadata = std::fs::metadata(path)
            .map_err(|e| PhotoTrailsError::Other(format!("Cannot read {}: {}", path.display(), e)))?;

        if metadata.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(error = %e, "Skipping unreadable entry");
                        continue;
                    }
                };
                if entry.file_type().is_file() && is_media_file(entry.path()) {
                    let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                    items.push(file_item(entry.path(), size));
                }
            }
        } else {
            items.push(file_item(path, metadata.len()));
        }
    }

    Ok(items)
}

fn file_item(path: &Path, size: u64) -> FileItem {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    FileItem::new(name, size, path)
}
