//! The standard build tasks and the graph that wires them together.

mod clean;
mod copy;
mod fonts;
mod html;
mod images;
mod lint;
mod styles;
mod vulcanize;

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::orchestrator::{PlanError, TaskGraph};
use crate::task::{TaskError, TaskReport};

pub use images::ImageTask;
pub use lint::{lint_sources, LintTask};
pub use styles::StyleTask;
pub use vulcanize::Vulcanizer;

/// The production task graph:
/// `clean → {copy, styles} → elements → {lint, images, fonts, html} → vulcanize`.
pub fn standard_graph() -> Result<TaskGraph, PlanError> {
    let mut graph = TaskGraph::new();

    graph.add_fn("clean", &[], clean::run)?;
    graph.add_fn("copy", &["clean"], copy::run)?;
    graph.add(StyleTask::new("styles", "styles"), &["clean"])?;
    graph.add(StyleTask::new("elements", "elements"), &["copy", "styles"])?;
    graph.add(LintTask::new(), &["elements"])?;
    graph.add(ImageTask::new(), &["elements"])?;
    graph.add_fn("fonts", &["elements"], fonts::run)?;
    graph.add_fn("html", &["elements"], html::run)?;
    graph.add_fn("vulcanize", &["lint", "images", "fonts", "html"], vulcanize::run)?;

    Ok(graph)
}

/// Every file under `dir` accepted by `filter`, sorted by path.
///
/// A missing directory yields no files.
pub(crate) fn collect_files(dir: &Path, filter: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| filter(p.as_path()))
        .collect()
}

pub(crate) fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|x| ext.eq_ignore_ascii_case(x)))
}

/// Write `contents`, creating parent directories. Returns the bytes written.
pub(crate) fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<u64, TaskError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(TaskError::io(parent))?;
    }
    let contents = contents.as_ref();
    fs::write(path, contents).map_err(TaskError::io(path))?;
    Ok(contents.len() as u64)
}

pub(crate) fn copy_file(from: &Path, to: &Path) -> Result<u64, TaskError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(TaskError::io(parent))?;
    }
    fs::copy(from, to).map_err(TaskError::io(from))
}

/// Mirror the files under `from` accepted by `filter` into `to`.
pub(crate) fn copy_tree(
    from: &Path,
    to: &Path,
    filter: impl Fn(&Path) -> bool,
) -> Result<TaskReport, TaskError> {
    let mut report = TaskReport::default();

    for path in collect_files(from, filter) {
        let relative = path.strip_prefix(from).unwrap_or(&path);
        report.add_file(copy_file(&path, &to.join(relative))?);
    }

    Ok(report)
}
