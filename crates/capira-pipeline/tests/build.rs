use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use capira_pipeline::{BuildError, Pipeline, PipelineConfig, TaskError};
use tempfile::tempdir;
use walkdir::WalkDir;

fn write(root: &Path, path: &str, contents: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn scaffold(root: &Path) {
    write(
        root,
        "src/index.html",
        r#"<!doctype html>
<html>
<head>
  <!-- build:css styles/app.css -->
  <link rel="stylesheet" href="styles/main.css">
  <!-- endbuild -->
  <link rel="import" href="elements/elements.html">
</head>
<body>
  <span id="browser-sync-binding"></span>
  <!-- build:js scripts/app.js -->
  <script src="scripts/app.js"></script>
  <!-- endbuild -->
</body>
</html>
"#,
    );
    write(root, "src/styles/main.css", "body {\n  display: flex;\n  margin: 0;\n}\n");
    write(root, "src/scripts/app.js", "var app = document.querySelector('#app');\n");
    write(
        root,
        "src/elements/elements.html",
        "<!-- Polymer and app elements -->\n<link rel=\"import\" href=\"../bower_components/polymer/polymer.html\">\n<link rel=\"import\" href=\"quiz/quiz-card.html\">\n",
    );
    write(
        root,
        "src/elements/quiz/quiz-card.html",
        "<link rel=\"import\" href=\"../../bower_components/polymer/polymer.html\">\n<dom-module id=\"quiz-card\">\n  <link rel=\"stylesheet\" href=\"quiz-card.css\">\n  <template><content></content></template>\n</dom-module>\n<script>\n  Polymer({ is: 'quiz-card' });\n</script>\n",
    );
    write(root, "src/elements/quiz/quiz-card.css", ":host {\n  display: flex;\n}\n");
    write(root, "src/images/play.svg", "<svg>\n  <!-- icon -->\n  <path d=\"M0 0\"/>\n</svg>\n");
    write(root, "src/fonts/roboto.woff", "woff");
    write(root, "bower_components/polymer/polymer.html", "<script>var Polymer = function () {};</script>\n");
}

fn pipeline(root: &Path) -> Pipeline {
    Pipeline::new(PipelineConfig {
        root: root.to_path_buf(),
        ..Default::default()
    })
    .unwrap()
}

/// Every file under `dir` with its contents.
fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e.path().strip_prefix(dir).unwrap().to_path_buf();
            (relative, fs::read(e.path()).unwrap())
        })
        .collect()
}

#[tokio::test]
async fn builds_distribution_tree() {
    let temp = tempdir().unwrap();
    scaffold(temp.path());

    let result = pipeline(temp.path()).build().await.unwrap();

    assert_eq!(result.tasks, 9);
    let dist = temp.path().join("dist");

    let index = fs::read_to_string(dist.join("index.html")).unwrap();
    assert!(index.contains(r#"<link rel="stylesheet" href="styles/app.css">"#));
    assert!(index.contains("elements/elements.vulcanized.html"));
    assert!(index.contains(r#"<span id="browser-sync-binding"></span>"#));
    assert!(!index.contains("build:"));

    assert!(dist.join("styles/app.css").exists());
    assert!(dist.join("scripts/app.js").exists());
    assert!(dist.join("images/play.svg").exists());
    assert!(dist.join("fonts/roboto.woff").exists());
    assert!(dist.join("bower_components/polymer/polymer.html").exists());

    let vulcanized = fs::read_to_string(dist.join("elements/elements.vulcanized.html")).unwrap();
    assert!(!vulcanized.contains("rel=\"import\""));
    assert!(!vulcanized.contains("<!--"));
    assert_eq!(vulcanized.matches("var Polymer").count(), 1);
    assert!(vulcanized.contains("<dom-module id=\"quiz-card\">"));
    assert!(vulcanized.contains("<style>"));
    assert!(vulcanized.contains("-webkit-"));
    assert!(vulcanized.contains("Polymer({ is: 'quiz-card' });"));
}

#[tokio::test]
async fn clean_builds_are_identical() {
    let temp = tempdir().unwrap();
    scaffold(temp.path());
    let pipeline = pipeline(temp.path());

    pipeline.build().await.unwrap();
    let first = snapshot(&temp.path().join("dist"));
    pipeline.build().await.unwrap();
    let second = snapshot(&temp.path().join("dist"));

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn lint_errors_stop_before_vulcanize() {
    let temp = tempdir().unwrap();
    scaffold(temp.path());
    write(temp.path(), "src/scripts/broken.js", "function (\n");

    let result = pipeline(temp.path()).build().await;

    match result {
        Err(BuildError::TaskFailed { task, source }) => {
            assert_eq!(task, "lint");
            assert!(matches!(source, TaskError::Lint { errors, files: 1 } if errors > 0));
        }
        other => panic!("expected lint failure, got {:?}", other.map(|_| ())),
    }

    // The entry document was copied but never flattened
    let entry = fs::read_to_string(temp.path().join("dist/elements/elements.vulcanized.html")).unwrap();
    assert!(entry.contains("rel=\"import\""));
}

#[tokio::test]
async fn writes_precache_manifest_after_build() {
    let temp = tempdir().unwrap();
    scaffold(temp.path());
    let pipeline = pipeline(temp.path());

    pipeline.build().await.unwrap();
    let path = pipeline.precache().unwrap();

    let manifest: Vec<String> = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert!(manifest.contains(&"styles/main.css".to_string()));
    assert!(manifest.contains(&"elements/elements.vulcanized.html".to_string()));
    assert_eq!(manifest.last().unwrap(), "bower_components/webcomponentsjs/webcomponents-lite.min.js");
}
