use std::path::PathBuf;

use capira_lint::{lint_files, JsLinter, LintError, LintReport, Linter};

use crate::context::BuildContext;
use crate::task::{Task, TaskError, TaskReport};
use crate::tasks::{collect_files, has_extension};

/// Files the linter checks: app scripts plus element scripts and markup.
pub fn lint_sources(ctx: &BuildContext) -> Vec<PathBuf> {
    let mut files = collect_files(&ctx.src("scripts"), |p| has_extension(p, &["js"]));
    files.extend(collect_files(&ctx.src("elements"), |p| {
        has_extension(p, &["js", "html"])
    }));
    files
}

/// Lint the script sources, failing on errors unless configured otherwise.
pub struct LintTask {
    linter: Box<dyn Linter>,
}

impl LintTask {
    pub fn new() -> Self {
        Self::with_linter(JsLinter::new())
    }

    pub fn with_linter(linter: impl Linter + 'static) -> Self {
        Self {
            linter: Box::new(linter),
        }
    }

    /// Lint without failing; diagnostics are left to the caller.
    pub fn check(&self, ctx: &BuildContext) -> Result<LintReport, TaskError> {
        lint_files(self.linter.as_ref(), &lint_sources(ctx)).map_err(|e| match e {
            LintError::Read { path, source } => TaskError::Io { path, source },
        })
    }
}

impl Default for LintTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for LintTask {
    fn name(&self) -> &str {
        "lint"
    }

    fn run(&self, ctx: &BuildContext) -> Result<TaskReport, TaskError> {
        let report = self.check(ctx)?;

        for diagnostic in &report.diagnostics {
            tracing::warn!("{}", diagnostic);
        }

        if report.has_errors() && ctx.lint_fail_on_error {
            return Err(TaskError::Lint {
                errors: report.error_count(),
                files: report.files_with_problems(),
            });
        }

        tracing::debug!("Linted {} file(s)", report.files_checked);
        Ok(TaskReport::default())
    }
}
