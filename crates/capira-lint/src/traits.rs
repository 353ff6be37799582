//! Trait definitions for script linters.

use std::fmt;
use std::path::PathBuf;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// A single problem found in a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// File the problem was found in
    pub path: PathBuf,

    /// 1-based line
    pub line: usize,

    /// 1-based column
    pub column: usize,

    pub severity: Severity,

    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(
            f,
            "{}:{}:{}  {}  {}",
            self.path.display(),
            self.line,
            self.column,
            level,
            self.message
        )
    }
}

/// Errors that stop a file from being linted at all.
#[derive(Debug, thiserror::Error)]
pub enum LintError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Trait for language-specific linters.
pub trait Linter: Send + Sync {
    /// Linter identifier (e.g., "js")
    fn name(&self) -> &'static str;

    /// File extensions this linter handles directly
    fn extensions(&self) -> &[&'static str];

    /// Lint a piece of source code.
    ///
    /// # Arguments
    /// * `source` - The script source
    /// * `path` - File the source came from, used in diagnostics
    /// * `line_offset` - Lines preceding `source` in that file
    fn lint(&self, source: &str, path: &std::path::Path, line_offset: usize) -> Vec<Diagnostic>;
}
