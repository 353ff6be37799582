//! Lint command.

use anyhow::Result;
use capira_pipeline::tasks::LintTask;
use capira_pipeline::{BuildContext, Pipeline};

use crate::config::ConfigFile;

/// Lint sources; fails when any error is found.
pub async fn run(config: &ConfigFile) -> Result<()> {
    let pipeline = Pipeline::new(config.pipeline_config())?;
    let checked = lint(pipeline.context())?;

    tracing::info!("Linted {} files, no errors", checked);
    Ok(())
}

/// Lint and log every diagnostic. Returns the number of files checked.
fn lint(ctx: &BuildContext) -> Result<usize> {
    let report = LintTask::new().check(ctx)?;

    for diagnostic in &report.diagnostics {
        tracing::warn!("{}", diagnostic);
    }

    if report.has_errors() {
        anyhow::bail!(
            "Lint failed: {} error(s) in {} of {} file(s)",
            report.error_count(),
            report.files_with_problems(),
            report.files_checked
        );
    }
    Ok(report.files_checked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use capira_pipeline::PipelineConfig;
    use std::fs;
    use tempfile::tempdir;

    fn context(root: &std::path::Path) -> BuildContext {
        BuildContext::new(&PipelineConfig {
            root: root.to_path_buf(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn counts_checked_files() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src/scripts")).unwrap();
        fs::create_dir_all(temp.path().join("src/elements")).unwrap();
        fs::write(temp.path().join("src/scripts/app.js"), "var app = {};\n").unwrap();
        fs::write(
            temp.path().join("src/elements/quiz.html"),
            "<script>\n  Polymer({ is: 'quiz' });\n</script>\n",
        )
        .unwrap();

        assert_eq!(lint(&context(temp.path())).unwrap(), 2);
    }

    #[test]
    fn fails_on_errors() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src/scripts")).unwrap();
        fs::write(temp.path().join("src/scripts/broken.js"), "function (\n").unwrap();

        let error = lint(&context(temp.path())).unwrap_err();

        assert!(error.to_string().contains("1 of 1 file(s)"));
    }
}
