//! `<!-- build:css|js ... -->` block parsing.
//!
//! A build block wraps a run of stylesheet links or script tags that should be
//! concatenated into a single bundle:
//!
//! ```html
//! <!-- build:css styles/app.css -->
//! <link rel="stylesheet" href="styles/main.css">
//! <link rel="stylesheet" href="styles/theme.css">
//! <!-- endbuild -->
//! ```

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// Bundle type of a build block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Css,
    Js,
}

/// A build block found in an HTML document.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildBlock {
    pub kind: BlockKind,

    /// Bundle path, relative to the document
    pub output: String,

    /// Asset references inside the block, in document order
    pub references: Vec<String>,

    /// Byte range of the whole block, markers included
    pub span: Range<usize>,
}

impl BuildBlock {
    /// The single tag that replaces the block.
    pub fn replacement_tag(&self) -> String {
        match self.kind {
            BlockKind::Css => format!(r#"<link rel="stylesheet" href="{}">"#, self.output),
            BlockKind::Js => format!(r#"<script src="{}"></script>"#, self.output),
        }
    }
}

/// Find every build block in a document.
pub fn parse_blocks(html: &str) -> Vec<BuildBlock> {
    static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)<!--\s*build:(css|js)\s+(\S+)\s*-->(.*?)<!--\s*endbuild\s*-->")
            .expect("Invalid build block regex")
    });
    static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(?i)<link\b[^>]*\bhref\s*=\s*["']([^"']+)["']"#).expect("Invalid href regex")
    });
    static SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(?i)<script\b[^>]*\bsrc\s*=\s*["']([^"']+)["']"#).expect("Invalid src regex")
    });

    BLOCK_RE
        .captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let (kind, pattern) = match &caps[1] {
                "css" => (BlockKind::Css, &*HREF_RE),
                _ => (BlockKind::Js, &*SRC_RE),
            };

            Some(BuildBlock {
                kind,
                output: caps[2].to_string(),
                references: pattern
                    .captures_iter(&caps[3])
                    .map(|r| r[1].to_string())
                    .collect(),
                span: whole.range(),
            })
        })
        .collect()
}
