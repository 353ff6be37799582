//! Flattening of the element import tree into a single document.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::assets::strip_comments;
use crate::context::BuildContext;
use crate::task::{TaskError, TaskReport};
use crate::tasks::write_file;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<link\b[^>]*>|<script\b[^>]*\bsrc\s*=\s*["'][^"']*["'][^>]*>\s*</script\s*>"#)
        .expect("Invalid import tag regex")
});
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("Invalid attribute regex")
});

/// Flatten `dist/elements/elements.vulcanized.html` in place.
pub(crate) fn run(ctx: &BuildContext) -> Result<TaskReport, TaskError> {
    let entry = ctx.dist("elements/elements.vulcanized.html");
    let flattened = Vulcanizer::new()
        .with_fallback(&ctx.dist_dir, &ctx.src_dir)
        .run(&entry)?;

    let mut report = TaskReport::default();
    report.add_file(write_file(&entry, flattened)?);
    Ok(report)
}

/// Inlines HTML imports, stylesheets and scripts into one document.
///
/// Each import is inlined once; repeated or cyclic imports are dropped.
/// External URLs are left alone. Comments other than conditional comments
/// are removed from every inlined document.
#[derive(Debug, Default)]
pub struct Vulcanizer {
    fallback: Option<(PathBuf, PathBuf)>,
}

impl Vulcanizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up references missing under `output_root` at the same relative
    /// path under `source_root`.
    pub fn with_fallback(mut self, output_root: &Path, source_root: &Path) -> Self {
        self.fallback = Some((output_root.to_path_buf(), source_root.to_path_buf()));
        self
    }

    /// Flatten the document at `entry`.
    pub fn run(&self, entry: &Path) -> Result<String, TaskError> {
        let html = fs::read_to_string(entry).map_err(TaskError::io(entry))?;
        let mut seen = HashSet::new();
        seen.insert(canonical(entry));

        self.inline(&html, entry, &mut seen)
    }

    /// Inline the references of one document. Commented-out tags are removed
    /// before scanning so they are never followed.
    fn inline(&self, html: &str, document: &Path, seen: &mut HashSet<PathBuf>) -> Result<String, TaskError> {
        let html = strip_comments(html);
        let html = html.as_str();
        let mut out = String::with_capacity(html.len());
        let mut last = 0;

        for tag in TAG_RE.find_iter(html) {
            out.push_str(&html[last..tag.start()]);
            last = tag.end();

            let replacement = self.replace_tag(tag.as_str(), document, seen)?;
            out.push_str(replacement.as_deref().unwrap_or(tag.as_str()));
        }
        out.push_str(&html[last..]);

        Ok(out)
    }

    /// The inlined form of a tag, or `None` to keep it as written.
    fn replace_tag(
        &self,
        tag: &str,
        document: &Path,
        seen: &mut HashSet<PathBuf>,
    ) -> Result<Option<String>, TaskError> {
        let attrs = attributes(tag);
        let attr = |name: &str| {
            attrs
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        };

        if tag[1..].to_ascii_lowercase().starts_with("script") {
            let Some(src) = attr("src").filter(|s| !is_external(s)) else {
                return Ok(None);
            };
            let script = self.read_reference(document, src)?;
            return Ok(Some(format!("<script>{}</script>", script.replace("</script", "<\\/script"))));
        }

        let Some(href) = attr("href").filter(|h| !is_external(h)) else {
            return Ok(None);
        };
        match attr("rel").map(str::to_ascii_lowercase).as_deref() {
            Some("import") => {
                let path = self.resolve(document, href)?;
                if !seen.insert(canonical(&path)) {
                    return Ok(Some(String::new()));
                }
                let imported = fs::read_to_string(&path).map_err(TaskError::io(&path))?;
                self.inline(&imported, &path, seen).map(Some)
            }
            Some("stylesheet") => {
                let css = self.read_reference(document, href)?;
                Ok(Some(format!("<style>{}</style>", css)))
            }
            _ => Ok(None),
        }
    }

    fn read_reference(&self, document: &Path, reference: &str) -> Result<String, TaskError> {
        let path = self.resolve(document, reference)?;
        fs::read_to_string(&path).map_err(TaskError::io(&path))
    }

    fn resolve(&self, document: &Path, reference: &str) -> Result<PathBuf, TaskError> {
        let reference_path = reference.split(['?', '#']).next().unwrap_or(reference);
        let path = document
            .parent()
            .unwrap_or(Path::new(""))
            .join(reference_path);

        if path.is_file() {
            return Ok(path);
        }

        let fallback = self.fallback.as_ref().and_then(|(output_root, source_root)| {
            let relative = normalize(&path).strip_prefix(normalize(output_root)).ok()?.to_path_buf();
            Some(source_root.join(relative)).filter(|p| p.is_file())
        });

        fallback.ok_or_else(|| TaskError::MissingAsset {
            path: document.to_path_buf(),
            reference: reference.to_string(),
        })
    }
}

fn attributes(tag: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(tag)
        .map(|caps: Captures| {
            let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
            (caps[1].to_string(), value.to_string())
        })
        .collect()
}

fn is_external(url: &str) -> bool {
    url.contains("://") || url.starts_with("//") || url.starts_with("data:")
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| normalize(path))
}

/// Resolve `.` and `..` components lexically.
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn write(root: &Path, path: &str, contents: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn inlines_imports_styles_and_scripts() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        write(
            root,
            "elements/elements.html",
            "<!-- app elements -->\n<link rel=\"import\" href=\"../lib/base.html\">\n<link rel=\"import\" href=\"quiz/quiz.html\">\n",
        );
        write(root, "lib/base.html", "<script>var Base = {};</script>\n");
        write(
            root,
            "elements/quiz/quiz.html",
            "<link rel=\"import\" href=\"../../lib/base.html\">\n<dom-module id=\"quiz\"><link rel=\"stylesheet\" href=\"quiz.css\"></dom-module>\n<script src=\"quiz.js\"></script>\n",
        );
        write(root, "elements/quiz/quiz.css", ":host{display:block}");
        write(root, "elements/quiz/quiz.js", "Polymer({is: 'quiz'});");

        let flattened = Vulcanizer::new().run(&root.join("elements/elements.html")).unwrap();

        assert_eq!(
            flattened,
            "\n<script>var Base = {};</script>\n\n\n<dom-module id=\"quiz\"><style>:host{display:block}</style></dom-module>\n<script>Polymer({is: 'quiz'});</script>\n\n"
        );
    }

    #[test]
    fn ignores_cycles_and_external_urls() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        write(
            root,
            "a.html",
            "<link rel=\"import\" href=\"b.html\"><link rel=\"stylesheet\" href=\"https://fonts.example.com/css\"><p>a</p>",
        );
        write(root, "b.html", "<link rel=\"import\" href=\"a.html\"><p>b</p>");

        let flattened = Vulcanizer::new().run(&root.join("a.html")).unwrap();

        assert_eq!(
            flattened,
            "<p>b</p><link rel=\"stylesheet\" href=\"https://fonts.example.com/css\"><p>a</p>"
        );
    }

    #[test]
    fn falls_back_to_source_tree() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        write(root, "dist/elements/quiz.html", "<script src=\"quiz.js\"></script>");
        write(root, "src/elements/quiz.js", "var quiz;");

        let flattened = Vulcanizer::new()
            .with_fallback(&root.join("dist"), &root.join("src"))
            .run(&root.join("dist/elements/quiz.html"))
            .unwrap();

        assert_eq!(flattened, "<script>var quiz;</script>");
    }

    #[test]
    fn reports_missing_imports() {
        let temp = tempdir().unwrap();
        write(temp.path(), "index.html", "<link rel=\"import\" href=\"missing.html\">");

        match Vulcanizer::new().run(&temp.path().join("index.html")) {
            Err(TaskError::MissingAsset { reference, .. }) => assert_eq!(reference, "missing.html"),
            other => panic!("expected missing asset, got {:?}", other),
        }
    }

    #[test]
    fn skips_commented_out_missing_import() {
        let temp = tempdir().unwrap();
        write(
            temp.path(),
            "elements/elements.html",
            "<!-- service worker\n<link rel=\"import\" href=\"../bower_components/platinum-sw/platinum-sw-cache.html\">\n-->\n<p>app</p>\n",
        );

        let flattened = Vulcanizer::new()
            .run(&temp.path().join("elements/elements.html"))
            .unwrap();

        assert_eq!(flattened, "\n<p>app</p>\n");
    }

    #[test]
    fn does_not_inline_commented_out_import() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        write(
            root,
            "elements.html",
            "<!--\n<link rel=\"import\" href=\"sw.html\">\n-->\n<p>app</p>\n",
        );
        write(root, "sw.html", "<!-- sw -->\n<script>var SW = 1;</script>\n");

        let flattened = Vulcanizer::new().run(&root.join("elements.html")).unwrap();

        assert_eq!(flattened, "\n<p>app</p>\n");
        assert!(!flattened.contains("-->"));
        assert!(!flattened.contains("SW"));
    }
}
