//! Extraction of inline scripts from HTML documents.

use std::sync::LazyLock;

use regex::Regex;

/// An inline script found in an HTML document.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptBlock {
    /// Script body
    pub source: String,

    /// Number of lines in the document before the body starts
    pub line_offset: usize,
}

/// Extract every inline JavaScript block from an HTML document.
///
/// Scripts with a `src` attribute and non-JavaScript types (templates, JSON)
/// are skipped.
pub fn extract_scripts(html: &str) -> Vec<ScriptBlock> {
    static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>").expect("Invalid script regex")
    });
    static SRC_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)\bsrc\s*=").expect("Invalid src regex"));
    static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(?i)\btype\s*=\s*["']?([^"'\s>]+)"#).expect("Invalid type regex")
    });

    let mut blocks = Vec::new();

    for caps in SCRIPT_RE.captures_iter(html) {
        let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let Some(body) = caps.get(2) else {
            continue;
        };

        if SRC_RE.is_match(attrs) {
            continue;
        }

        if let Some(kind) = TYPE_RE.captures(attrs).and_then(|c| c.get(1)) {
            if !is_javascript_type(kind.as_str()) {
                continue;
            }
        }

        if body.as_str().trim().is_empty() {
            continue;
        }

        blocks.push(ScriptBlock {
            source: body.as_str().to_string(),
            line_offset: html[..body.start()].matches('\n').count(),
        });
    }

    blocks
}

fn is_javascript_type(kind: &str) -> bool {
    matches!(
        kind.to_ascii_lowercase().as_str(),
        "text/javascript" | "application/javascript" | "text/ecmascript" | "module"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_inline_scripts() {
        let html = r#"<dom-module id="quiz-card">
  <template><p>Hi</p></template>
  <script>
    Polymer({ is: 'quiz-card' });
  </script>
</dom-module>"#;

        let blocks = extract_scripts(html);

        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].source.contains("Polymer"));
        assert_eq!(blocks[0].line_offset, 2);
    }

    #[test]
    fn skips_external_and_non_js_scripts() {
        let html = r#"
<script src="app.js"></script>
<script type="text/template"><div></div></script>
<script type="application/json">{"a": 1}</script>
<script type="text/javascript">var x = 1;</script>
"#;

        let blocks = extract_scripts(html);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].source, "var x = 1;");
        assert_eq!(blocks[0].line_offset, 4);
    }

    #[test]
    fn ignores_empty_scripts() {
        assert!(extract_scripts("<script>  \n </script>").is_empty());
    }
}
