//! The precache manifest consumed by the offline-caching service worker.

use std::path::{Path, PathBuf};

use crate::task::{TaskError, TaskReport};
use crate::tasks::{collect_files, write_file};

/// Directories under `dist` whose files are precached.
const PRECACHED_DIRS: &[&str] = &["elements", "scripts", "styles"];

/// Entries always appended after the scanned files.
const EXTRA_ENTRIES: &[&str] = &[
    "index.html",
    "./",
    "bower_components/webcomponentsjs/webcomponents-lite.min.js",
];

/// Manifest entries for a distribution tree, relative and `/`-separated.
///
/// Only files with an extension are listed; hidden files are skipped.
pub fn precache_entries(dist_dir: &Path) -> Vec<String> {
    let mut entries: Vec<String> = PRECACHED_DIRS
        .iter()
        .flat_map(|dir| collect_files(&dist_dir.join(dir), |p| is_precached(dist_dir, p)))
        .filter_map(|path| {
            let relative = path.strip_prefix(dist_dir).ok()?;
            let parts: Vec<_> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect();
            Some(parts.join("/"))
        })
        .collect();
    entries.sort();

    entries.extend(EXTRA_ENTRIES.iter().map(|e| e.to_string()));
    entries
}

fn is_precached(dist_dir: &Path, path: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(dist_dir) else {
        return false;
    };
    let hidden = relative
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'));
    !hidden && path.extension().is_some()
}

/// Write `precache.json` into the distribution tree.
pub fn write_precache(dist_dir: &Path) -> Result<(PathBuf, TaskReport), TaskError> {
    let entries = precache_entries(dist_dir);
    let json = serde_json::to_string(&entries)
        .map_err(|e| TaskError::Failed(format!("Failed to serialize precache manifest: {}", e)))?;

    let path = dist_dir.join("precache.json");
    let mut report = TaskReport::default();
    report.add_file(write_file(&path, json)?);

    tracing::info!("Precache manifest lists {} entries", entries.len());
    Ok((path, report))
}
