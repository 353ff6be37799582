//! TODO and FIXME collection from source comments.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use walkdir::WalkDir;

use crate::builder::BuildError;
use crate::tasks::has_extension;
use crate::templates::TemplateEngine;

/// Directories never scanned for comments.
const EXCLUDED_DIRS: &[&str] = &["bower_components", "node_modules", "dist", ".tmp", "target", ".git"];

/// A marker comment found in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoItem {
    /// `TODO` or `FIXME`
    pub kind: String,

    /// Path relative to the scanned root, `/`-separated
    pub file: String,

    pub line: usize,

    pub text: String,
}

/// The items of one marker kind, as rendered in `TODO.md`.
#[derive(Debug, Clone, Serialize)]
pub struct TodoSection {
    pub kind: String,
    pub title: String,
    pub items: Vec<TodoItem>,
}

/// Collect marker comments from the `.js` and `.html` files under `root`.
///
/// With a `query`, only items whose text or file contains it
/// (case-insensitively) are kept.
pub fn collect_todos(root: &Path, query: Option<&str>) -> Vec<TodoItem> {
    let query = query.map(str::to_lowercase).filter(|q| !q.is_empty());

    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_excluded_dir(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), &["js", "html"]))
        .flat_map(|e| scan_file(root, e.path()))
        .filter(|item| match &query {
            Some(q) => {
                item.text.to_lowercase().contains(q) || item.file.to_lowercase().contains(q)
            }
            None => true,
        })
        .collect()
}

fn is_excluded_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| EXCLUDED_DIRS.contains(&name))
}

fn scan_file(root: &Path, path: &Path) -> Vec<TodoItem> {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            tracing::warn!("Skipping {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    let file = relative_name(root, path);

    source
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            parse_marker(line).map(|(kind, text)| TodoItem {
                kind: kind.to_string(),
                file: file.clone(),
                line: i + 1,
                text,
            })
        })
        .collect()
}

fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    parts.join("/")
}

/// Extract `(kind, text)` from a line holding a marker comment.
fn parse_marker(line: &str) -> Option<(&'static str, String)> {
    static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?://|/\*+|<!--|^\s*\*)\s*(TODO|FIXME)\b\s*:?\s*(.*)$")
            .expect("Invalid todo marker regex")
    });

    let caps = MARKER_RE.captures(line)?;
    let kind = if &caps[1] == "TODO" { "TODO" } else { "FIXME" };
    let text = caps[2]
        .trim_end()
        .trim_end_matches("-->")
        .trim_end_matches("*/")
        .trim_end()
        .to_string();

    Some((kind, text))
}

/// Group items by kind, TODOs first. Kinds without items are omitted.
pub fn sections(items: &[TodoItem]) -> Vec<TodoSection> {
    [("TODO", "TODOs"), ("FIXME", "FIXMEs")]
        .into_iter()
        .map(|(kind, title)| TodoSection {
            kind: kind.to_string(),
            title: title.to_string(),
            items: items.iter().filter(|i| i.kind == kind).cloned().collect(),
        })
        .filter(|s| !s.items.is_empty())
        .collect()
}

/// Scan `root` and write `TODO.md` there. Returns the file and item count.
pub fn write_todo_list(root: &Path, query: Option<&str>) -> Result<(PathBuf, usize), BuildError> {
    let items = collect_todos(root, query);
    let markdown = TemplateEngine::new()
        .render_todo(&sections(&items))
        .map_err(|e| BuildError::TemplateError(e.to_string()))?;

    let path = root.join("TODO.md");
    fs::write(&path, markdown).map_err(|e| BuildError::WriteError {
        path: path.clone(),
        message: e.to_string(),
    })?;

    tracing::info!("Wrote {} item(s) to {}", items.len(), path.display());
    Ok((path, items.len()))
}
