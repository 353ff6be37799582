//! The unit of work the orchestrator schedules.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::context::BuildContext;

/// Files and bytes written by a task, used for size reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskReport {
    pub files: usize,
    pub bytes: u64,
}

impl TaskReport {
    /// Record one written file.
    pub fn add_file(&mut self, bytes: u64) {
        self.files += 1;
        self.bytes += bytes;
    }

    pub fn merge(&mut self, other: TaskReport) {
        self.files += other.files;
        self.bytes += other.bytes;
    }
}

impl fmt::Display for TaskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} file(s), {}", self.files, format_bytes(self.bytes))
    }
}

fn format_bytes(bytes: u64) -> String {
    match bytes {
        b if b >= 1024 * 1024 => format!("{:.2} MB", b as f64 / (1024.0 * 1024.0)),
        b if b >= 1024 => format!("{:.2} kB", b as f64 / 1024.0),
        b => format!("{} B", b),
    }
}

/// Errors raised by a task's action.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSS error in {path}: {message}")]
    Css { path: PathBuf, message: String },

    #[error("JS error in {path}: {message}")]
    Js { path: PathBuf, message: String },

    #[error("Lint failed: {errors} error(s) in {files} file(s)")]
    Lint { errors: usize, files: usize },

    #[error("Missing asset '{reference}' referenced from {path}")]
    MissingAsset { path: PathBuf, reference: String },

    #[error("{0}")]
    Failed(String),
}

impl TaskError {
    /// Build a mapper from `io::Error` for the given path.
    pub fn io(path: &Path) -> impl FnOnce(std::io::Error) -> TaskError + '_ {
        move |source| TaskError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A named build step.
///
/// Actions are synchronous file transformations; the orchestrator decides
/// where and how concurrently they run.
pub trait Task: Send + Sync {
    /// Task name used in plans and logs
    fn name(&self) -> &str;

    /// Run the task against the build context.
    fn run(&self, ctx: &BuildContext) -> Result<TaskReport, TaskError>;
}

/// A task backed by a closure.
pub struct FnTask<F> {
    name: String,
    action: F,
}

impl<F> FnTask<F>
where
    F: Fn(&BuildContext) -> Result<TaskReport, TaskError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, action: F) -> Self {
        Self {
            name: name.into(),
            action,
        }
    }
}

impl<F> Task for FnTask<F>
where
    F: Fn(&BuildContext) -> Result<TaskReport, TaskError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &BuildContext) -> Result<TaskReport, TaskError> {
        (self.action)(ctx)
    }
}
