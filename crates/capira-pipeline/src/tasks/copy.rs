use std::fs;
use std::path::{Path, PathBuf};

use crate::context::BuildContext;
use crate::task::{TaskError, TaskReport};
use crate::tasks::{copy_file, copy_tree, has_extension};

/// Copy everything that ships without transformation.
pub(crate) fn run(ctx: &BuildContext) -> Result<TaskReport, TaskError> {
    let mut report = TaskReport::default();

    // Top-level app files, dotfiles included
    report.merge(copy_top_level(&ctx.src_dir, &ctx.dist_dir)?);

    report.merge(copy_tree(&ctx.bower_dir, &ctx.dist("bower_components"), |_| true)?);

    report.merge(copy_tree(&ctx.src("elements"), &ctx.dist("elements"), |p| {
        has_extension(p, &["html"])
    })?);

    report.merge(copy_flat(
        &ctx.bower_dir.join("platinum-sw/bootstrap"),
        &ctx.dist("elements/bootstrap"),
        "js",
    )?);
    report.merge(copy_flat(
        &ctx.bower_dir.join("sw-toolbox"),
        &ctx.dist("sw-toolbox"),
        "js",
    )?);

    // Entry document for vulcanize
    let elements = ctx.src("elements/elements.html");
    if elements.is_file() {
        report.add_file(copy_file(
            &elements,
            &ctx.dist("elements/elements.vulcanized.html"),
        )?);
    }

    Ok(report)
}

fn copy_top_level(from: &Path, to: &Path) -> Result<TaskReport, TaskError> {
    let mut report = TaskReport::default();

    for path in sorted_entries(from)? {
        let Some(name) = path.file_name() else {
            continue;
        };
        if !path.is_file() || name == "precache.json" {
            continue;
        }
        report.add_file(copy_file(&path, &to.join(name))?);
    }

    Ok(report)
}

/// Copy the files directly inside `from` with the given extension.
fn copy_flat(from: &Path, to: &Path, extension: &str) -> Result<TaskReport, TaskError> {
    let mut report = TaskReport::default();

    for path in sorted_entries(from)? {
        let Some(name) = path.file_name() else {
            continue;
        };
        if path.is_file() && has_extension(&path, &[extension]) {
            report.add_file(copy_file(&path, &to.join(name))?);
        }
    }

    Ok(report)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, TaskError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut entries = fs::read_dir(dir)
        .map_err(TaskError::io(dir))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect::<Vec<_>>();
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PipelineConfig;
    use tempfile::tempdir;

    #[test]
    fn copies_app_files_and_packages() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        for dir in [
            "src/test",
            "src/elements/quiz",
            "bower_components/polymer",
            "bower_components/platinum-sw/bootstrap",
            "bower_components/sw-toolbox",
        ] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        for (path, contents) in [
            ("src/index.html", "<html></html>"),
            ("src/.htaccess", "Options -Indexes"),
            ("src/precache.json", "[]"),
            ("src/test/index.html", "test"),
            ("src/elements/elements.html", "<link rel=\"import\" href=\"quiz/quiz.html\">"),
            ("src/elements/quiz/quiz.html", "<dom-module></dom-module>"),
            ("src/elements/quiz/quiz.css", ":host {}"),
            ("bower_components/polymer/polymer.html", "polymer"),
            ("bower_components/platinum-sw/bootstrap/sw.js", "sw"),
            ("bower_components/platinum-sw/bootstrap/README.md", "readme"),
            ("bower_components/sw-toolbox/sw-toolbox.js", "toolbox"),
        ] {
            fs::write(root.join(path), contents).unwrap();
        }
        let ctx = BuildContext::new(&PipelineConfig {
            root: root.to_path_buf(),
            ..Default::default()
        })
        .unwrap();

        let report = run(&ctx).unwrap();

        let dist = root.join("dist");
        assert!(dist.join("index.html").exists());
        assert!(dist.join(".htaccess").exists());
        assert!(!dist.join("precache.json").exists());
        assert!(!dist.join("test").exists());
        assert!(dist.join("bower_components/polymer/polymer.html").exists());
        assert!(dist.join("elements/quiz/quiz.html").exists());
        assert!(!dist.join("elements/quiz/quiz.css").exists());
        assert!(dist.join("elements/bootstrap/sw.js").exists());
        assert!(!dist.join("elements/bootstrap/README.md").exists());
        assert!(dist.join("sw-toolbox/sw-toolbox.js").exists());
        assert!(dist.join("elements/elements.vulcanized.html").exists());
        assert_eq!(report.files, 11);
    }

    #[test]
    fn tolerates_missing_sources() {
        let temp = tempdir().unwrap();
        let ctx = BuildContext::new(&PipelineConfig {
            root: temp.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(run(&ctx).unwrap(), TaskReport::default());
    }
}
