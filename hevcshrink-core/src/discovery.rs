//! File discovery module for finding video files to process.
//!
//! This module walks the input directory and yields every file whose extension
//! belongs to [`VIDEO_EXTENSIONS`](crate::config::VIDEO_EXTENSIONS)
//! (case-insensitive), skipping files whose name already carries the processed
//! marker. An empty directory is not an error.

use crate::config::VIDEO_EXTENSIONS;
use crate::error::{CoreError, CoreResult};

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Returns true if `path` has one of the recognized video extensions.
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Returns true if the file name of `path` contains `marker`.
pub fn carries_marker(path: &Path, marker: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.contains(marker))
}

fn check_root(root: &Path) -> CoreResult<()> {
    if !root.exists() {
        return Err(CoreError::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(CoreError::InvalidInput(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    Ok(())
}

/// Lazily scans `root` for processable video files.
///
/// Entries that cannot be read below the root are logged and skipped. The
/// root itself is checked eagerly so that a missing directory is reported
/// before iteration starts.
///
/// # Arguments
///
/// * `root` - The directory to scan
/// * `recursive` - Descend into subdirectories when true
/// * `marker` - Files whose name contains this substring are excluded
///
/// # Returns
///
/// * `Ok(iterator)` - Absolute paths of matching files, in traversal order
/// * `Err(CoreError::NotFound)` - If `root` does not exist
/// * `Err(CoreError::InvalidInput)` - If `root` is not a directory
pub fn scan_video_files<'a>(
    root: &Path,
    recursive: bool,
    marker: &'a str,
) -> CoreResult<impl Iterator<Item = PathBuf> + 'a> {
    check_root(root)?;
    let root = std::path::absolute(root)?;

    let mut walker = WalkDir::new(&root).follow_links(true);
    if !recursive {
        walker = walker.max_depth(1);
    }

    Ok(walker
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_video_file(path))
        .filter(move |path| {
            if carries_marker(path, marker) {
                log::debug!("Skipping already processed file: {}", path.display());
                false
            } else {
                true
            }
        }))
}

/// Finds video files eligible for processing, sorted by path.
///
/// # Examples
///
/// ```rust,no_run
/// use hevcshrink_core::find_processable_files;
/// use std::path::Path;
///
/// let files = find_processable_files(Path::new("/path/to/videos"), true, "_modified").unwrap();
/// for file in files {
///     println!("  {}", file.display());
/// }
/// ```
pub fn find_processable_files(root: &Path, recursive: bool, marker: &str) -> CoreResult<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = scan_video_files(root, recursive, marker)?.collect();
    files.sort();
    Ok(files)
}
