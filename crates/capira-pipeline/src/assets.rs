//! CSS, JavaScript and HTML transformations.

use std::sync::LazyLock;

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::Targets;
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;
use regex::Regex;

/// Asset transformation utilities.
pub struct AssetPipeline;

impl AssetPipeline {
    /// Add the vendor prefixes `targets` need, keeping the stylesheet readable.
    pub fn prefix_css(css: &str, targets: Targets) -> Result<String, String> {
        let stylesheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| format!("CSS parse error: {}", e))?;

        let printed = stylesheet
            .to_css(PrinterOptions {
                minify: false,
                targets,
                ..Default::default()
            })
            .map_err(|e| format!("CSS print error: {}", e))?;

        Ok(printed.code)
    }

    /// Minify CSS using lightningcss.
    pub fn minify_css(css: &str, targets: Targets) -> Result<String, String> {
        let mut stylesheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| format!("CSS parse error: {}", e))?;

        stylesheet
            .minify(MinifyOptions {
                targets,
                ..Default::default()
            })
            .map_err(|e| format!("CSS minify error: {}", e))?;

        let minified = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                targets,
                ..Default::default()
            })
            .map_err(|e| format!("CSS minify error: {}", e))?;

        Ok(minified.code)
    }

    /// Compress and mangle a classic script. Top-level names are kept since
    /// they are globals other scripts may use.
    pub fn minify_js(js: &str) -> Result<String, String> {
        let allocator = Allocator::default();
        let parsed = Parser::new(&allocator, js, SourceType::cjs()).parse();
        if let Some(error) = parsed.errors.first() {
            return Err(format!("JS parse error: {}", error.message));
        }

        let mut program = parsed.program;
        let minified = Minifier::new(MinifierOptions::default()).build(&allocator, &mut program);

        let code = Codegen::new()
            .with_options(CodegenOptions::minify())
            .with_scoping(minified.scoping)
            .build(&program)
            .code;

        Ok(code.trim_end().to_string())
    }

    /// Minify HTML: drop comments and collapse whitespace.
    ///
    /// Conditional comments survive. The bodies of `pre`, `textarea`, `script`
    /// and `style` elements are left untouched, and attribute quotes and empty
    /// attributes are kept as written.
    pub fn minify_html(html: &str) -> String {
        static RAW_RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"(?is)<(pre|textarea|script|style)\b[^>]*>.*?</(?:pre|textarea|script|style)\s*>")
                .expect("Invalid raw element regex")
        });

        let html = strip_comments(html);
        let mut out = String::with_capacity(html.len());
        let mut last = 0;

        for raw in RAW_RE.find_iter(&html) {
            out.push_str(&minify_markup(&html[last..raw.start()]));
            out.push_str(raw.as_str());
            last = raw.end();
        }
        out.push_str(&minify_markup(&html[last..]));

        out.trim().to_string()
    }
}

/// Remove comments other than IE conditional comments.
pub(crate) fn strip_comments(html: &str) -> String {
    static COMMENT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("Invalid comment regex"));

    COMMENT_RE
        .replace_all(html, |caps: &regex::Captures| {
            let comment = &caps[0];
            if comment.starts_with("<!--[if") || comment.starts_with("<!--<![endif]") {
                comment.to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

fn minify_markup(markup: &str) -> String {
    static BREAK_BETWEEN_TAGS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r">[ \t]*[\r\n]\s*<").expect("Invalid tag gap regex"));
    static WHITESPACE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

    let joined = BREAK_BETWEEN_TAGS_RE.replace_all(markup, "><");
    WHITESPACE_RE.replace_all(&joined, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{parse_browsers, DEFAULT_BROWSERS};
    use pretty_assertions::assert_eq;

    fn targets() -> Targets {
        Targets::from(parse_browsers(DEFAULT_BROWSERS).unwrap())
    }

    #[test]
    fn prefixes_css() {
        let css = ".toolbar {\n  display: flex;\n}\n";

        let prefixed = AssetPipeline::prefix_css(css, targets()).unwrap();

        assert!(prefixed.contains("-webkit-"));
        assert!(prefixed.contains("display: flex"));
        assert!(prefixed.contains('\n'));
    }

    #[test]
    fn minifies_css() {
        let css = r#"
.button {
    background-color: blue;
    padding: 10px;
}
        "#;

        let minified = AssetPipeline::minify_css(css, Targets::default()).unwrap();

        assert!(!minified.contains('\n'));
        assert!(minified.contains(".button"));
    }

    #[test]
    fn minifies_js() {
        let js = "// app shell\nwindow.app = {\n  ready: true\n};\nfunction start(options) {\n  var settings = options || {};\n  return settings;\n}\n";

        let minified = AssetPipeline::minify_js(js).unwrap();

        assert!(minified.len() < js.len());
        assert!(!minified.contains("app shell"));
        assert!(!minified.contains('\n'));
        assert!(minified.contains("window.app="));
        assert!(minified.contains("function start("));
    }

    #[test]
    fn rejects_invalid_js() {
        assert!(AssetPipeline::minify_js("function (").is_err());
    }

    #[test]
    fn minifies_html() {
        let html = "<html>\n  <!-- navigation -->\n  <body>\n    <p>Hello   world</p>\n  </body>\n</html>\n";

        assert_eq!(
            AssetPipeline::minify_html(html),
            "<html><body><p>Hello world</p></body></html>"
        );
    }

    #[test]
    fn keeps_raw_elements_and_conditional_comments() {
        let html = "<!--[if lt IE 9]><script src=\"shim.js\"></script><![endif]-->\n<pre>\n  a\n   b\n</pre>\n<script>\n  var  x = 1;\n</script>";

        let minified = AssetPipeline::minify_html(html);

        assert!(minified.contains("<!--[if lt IE 9]>"));
        assert!(minified.contains("<pre>\n  a\n   b\n</pre>"));
        assert!(minified.contains("var  x = 1;"));
    }
}
