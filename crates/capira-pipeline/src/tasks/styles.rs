use std::fs;
use std::path::Path;

use lightningcss::targets::Targets;
use rayon::prelude::*;

use crate::assets::AssetPipeline;
use crate::context::BuildContext;
use crate::task::{Task, TaskError, TaskReport};
use crate::tasks::{collect_files, has_extension, write_file};

/// Vendor-prefix and minify the stylesheets of one source directory.
///
/// Prefixed output lands in the intermediate tree; the distribution tree gets
/// the minified version.
pub struct StyleTask {
    name: String,
    dir: String,
}

impl StyleTask {
    /// A task named `name` processing `src/<dir>/**/*.css`.
    pub fn new(name: impl Into<String>, dir: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
        }
    }

    fn process(
        &self,
        ctx: &BuildContext,
        source_root: &Path,
        path: &Path,
        targets: Targets,
    ) -> Result<TaskReport, TaskError> {
        let relative = path.strip_prefix(source_root).unwrap_or(path);
        let tmp_out = ctx.tmp(&self.dir).join(relative);
        let dist_out = ctx.dist(&self.dir).join(relative);
        let mut report = TaskReport::default();

        if ctx.incremental && is_up_to_date(path, &tmp_out) && dist_out.exists() {
            tracing::debug!("{} is up to date", relative.display());
            return Ok(report);
        }

        let css = fs::read_to_string(path).map_err(TaskError::io(path))?;
        let css_error = |message| TaskError::Css {
            path: path.to_path_buf(),
            message,
        };

        let prefixed = AssetPipeline::prefix_css(&css, targets).map_err(css_error)?;
        write_file(&tmp_out, &prefixed)?;

        let output = if ctx.minify {
            AssetPipeline::minify_css(&prefixed, targets).map_err(css_error)?
        } else {
            prefixed
        };
        report.add_file(write_file(&dist_out, output)?);

        Ok(report)
    }
}

impl Task for StyleTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &BuildContext) -> Result<TaskReport, TaskError> {
        let source_root = ctx.src(&self.dir);
        let files = collect_files(&source_root, |p| has_extension(p, &["css"]));
        let targets = ctx.targets();

        let results: Vec<Result<TaskReport, TaskError>> = files
            .par_iter()
            .map(|path| self.process(ctx, &source_root, path, targets))
            .collect();

        let mut report = TaskReport::default();
        for result in results {
            report.merge(result?);
        }
        Ok(report)
    }
}

/// Whether `output` was written no earlier than `source` was modified.
fn is_up_to_date(source: &Path, output: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(source), modified(output)) {
        (Some(source), Some(output)) => output >= source,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PipelineConfig;
    use tempfile::tempdir;

    fn context(root: &Path, incremental: bool, minify: bool) -> BuildContext {
        BuildContext::new(&PipelineConfig {
            root: root.to_path_buf(),
            incremental,
            minify,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn writes_prefixed_and_minified_output() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src/styles/themes")).unwrap();
        fs::write(
            temp.path().join("src/styles/themes/dark.css"),
            ".player {\n  display: flex;\n  color: #ffffff;\n}\n",
        )
        .unwrap();
        let ctx = context(temp.path(), false, true);

        let report = StyleTask::new("styles", "styles").run(&ctx).unwrap();

        assert_eq!(report.files, 1);
        let tmp = fs::read_to_string(temp.path().join(".tmp/styles/themes/dark.css")).unwrap();
        let dist = fs::read_to_string(temp.path().join("dist/styles/themes/dark.css")).unwrap();
        assert!(tmp.contains("-webkit-"));
        assert!(tmp.contains('\n'));
        assert!(!dist.contains('\n'));
        assert!(dist.contains("-webkit-"));
        assert!(dist.len() < tmp.len());
    }

    #[test]
    fn skips_unchanged_sources_when_incremental() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src/elements/quiz")).unwrap();
        fs::write(temp.path().join("src/elements/quiz/quiz.css"), ":host { display: block; }").unwrap();
        let ctx = context(temp.path(), true, false);
        let task = StyleTask::new("elements", "elements");

        assert_eq!(task.run(&ctx).unwrap().files, 1);
        assert_eq!(task.run(&ctx).unwrap().files, 0);
    }

    #[test]
    fn reports_css_errors_with_path() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src/styles")).unwrap();
        fs::write(temp.path().join("src/styles/broken.css"), "..broken { color: red; }").unwrap();
        let ctx = context(temp.path(), false, true);

        match StyleTask::new("styles", "styles").run(&ctx) {
            Err(TaskError::Css { path, .. }) => assert!(path.ends_with("broken.css")),
            other => panic!("expected CSS error, got {:?}", other),
        }
    }
}
