//! Running a linter over a set of files.

use std::fs;
use std::path::PathBuf;

use crate::extract::extract_scripts;
use crate::traits::{Diagnostic, LintError, Linter, Severity};

/// Outcome of linting a set of files.
#[derive(Debug, Default)]
pub struct LintReport {
    /// Number of files inspected
    pub files_checked: usize,

    /// Every diagnostic, grouped by file in input order
    pub diagnostics: Vec<Diagnostic>,
}

impl LintReport {
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Number of distinct files with at least one diagnostic.
    pub fn files_with_problems(&self) -> usize {
        let mut paths: Vec<&PathBuf> = self.diagnostics.iter().map(|d| &d.path).collect();
        paths.dedup();
        paths.len()
    }
}

/// Lint every file in `files`.
///
/// Files matching the linter's extensions are linted whole; `.html` files have
/// their inline scripts extracted first. Other files are ignored.
pub fn lint_files(linter: &dyn Linter, files: &[PathBuf]) -> Result<LintReport, LintError> {
    let mut report = LintReport::default();

    for path in files {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let is_html = ext == "html" || ext == "htm";
        if !is_html && !linter.extensions().contains(&ext) {
            continue;
        }

        let source = fs::read_to_string(path).map_err(|source| LintError::Read {
            path: path.clone(),
            source,
        })?;

        let before = report.diagnostics.len();
        if is_html {
            for block in extract_scripts(&source) {
                report
                    .diagnostics
                    .extend(linter.lint(&block.source, path, block.line_offset));
            }
        } else {
            report.diagnostics.extend(linter.lint(&source, path, 0));
        }

        tracing::debug!(
            "{}: {} problem(s)",
            path.display(),
            report.diagnostics.len() - before
        );
        report.files_checked += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::js::JsLinter;
    use tempfile::tempdir;

    #[test]
    fn lints_js_and_html_files() {
        let temp = tempdir().unwrap();
        let good = temp.path().join("good.js");
        let bad = temp.path().join("bad.html");
        let ignored = temp.path().join("notes.txt");

        fs::write(&good, "var ok = true;\n").unwrap();
        fs::write(&bad, "<p>x</p>\n<script>\nvar = ;\n</script>\n").unwrap();
        fs::write(&ignored, "debugger").unwrap();

        let report = lint_files(&JsLinter::new(), &[good, bad.clone(), ignored]).unwrap();

        assert_eq!(report.files_checked, 2);
        assert!(report.has_errors());
        assert_eq!(report.files_with_problems(), 1);
        assert!(report.diagnostics.iter().all(|d| d.path == bad));
        assert_eq!(report.diagnostics[0].line, 3);
    }

    #[test]
    fn errors_on_missing_file() {
        let result = lint_files(&JsLinter::new(), &[PathBuf::from("/nonexistent/app.js")]);

        assert!(matches!(result, Err(LintError::Read { .. })));
    }
}
