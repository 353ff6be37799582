//! JavaScript linter backed by the oxc parser.

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::DebuggerStatement;
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::SourceType;

use crate::traits::{Diagnostic, Linter, Severity};

/// Lints classic (non-module) scripts.
#[derive(Debug, Default)]
pub struct JsLinter;

impl JsLinter {
    /// Create a new JavaScript linter.
    pub fn new() -> Self {
        Self
    }
}

impl Linter for JsLinter {
    fn name(&self) -> &'static str {
        "js"
    }

    fn extensions(&self) -> &[&'static str] {
        &["js"]
    }

    fn lint(&self, source: &str, path: &Path, line_offset: usize) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        let allocator = Allocator::default();
        let parsed = Parser::new(&allocator, source, SourceType::cjs()).parse();

        for error in &parsed.errors {
            let offset = error
                .labels
                .as_ref()
                .and_then(|labels| labels.first())
                .map(|label| label.offset())
                .unwrap_or(0);
            let (line, column) = line_col(source, offset);

            diagnostics.push(Diagnostic {
                path: path.to_path_buf(),
                line: line + line_offset,
                column,
                severity: Severity::Error,
                message: error.message.to_string(),
            });
        }

        let mut debuggers = DebuggerFinder::default();
        debuggers.visit_program(&parsed.program);

        for start in debuggers.offsets {
            let (line, column) = line_col(source, start);

            diagnostics.push(Diagnostic {
                path: path.to_path_buf(),
                line: line + line_offset,
                column,
                severity: Severity::Error,
                message: "Forgotten 'debugger' statement".to_string(),
            });
        }

        diagnostics.sort_by_key(|d| (d.line, d.column));
        diagnostics
    }
}

/// Collects the start offsets of `debugger` statements.
#[derive(Default)]
struct DebuggerFinder {
    offsets: Vec<usize>,
}

impl<'a> Visit<'a> for DebuggerFinder {
    fn visit_debugger_statement(&mut self, it: &DebuggerStatement) {
        self.offsets.push(it.span.start as usize);
    }
}

/// Convert a byte offset to a 1-based (line, column) pair.
pub(crate) fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..floor_char_boundary(source, offset)];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => before[newline + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}

fn floor_char_boundary(source: &str, mut offset: usize) -> usize {
    while offset > 0 && !source.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lint(source: &str) -> Vec<Diagnostic> {
        JsLinter::new().lint(source, Path::new("app.js"), 0)
    }

    #[test]
    fn accepts_valid_script() {
        let source = r#"
'use strict';
var app = document.querySelector('#app');
app.addEventListener('dom-change', function() {
  console.log('ready');
});
"#;

        assert!(lint(source).is_empty());
    }

    #[test]
    fn reports_syntax_errors_with_position() {
        let diagnostics = lint("var a = 1;\nvar b = (2;\n");

        assert!(!diagnostics.is_empty());
        assert_eq!(diagnostics[0].severity, Severity::Error);
        assert_eq!(diagnostics[0].line, 2);
    }

    #[test]
    fn reports_forgotten_debugger() {
        let diagnostics = lint("function f() {\n  debugger;\n}\n");

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, 2);
        assert_eq!(diagnostics[0].column, 3);
        assert!(diagnostics[0].message.contains("debugger"));
    }

    #[test]
    fn ignores_debugger_in_comments_and_strings() {
        let source = "/*\ndebugger statements are stripped in production\n*/\nvar hint = 'debugger';\n// debugger\n";

        assert!(lint(source).is_empty());
    }

    #[test]
    fn finds_debugger_inside_other_statements() {
        let diagnostics = lint("if (window.DEV) debugger;\n");

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, 1);
        assert_eq!(diagnostics[0].column, 17);
        assert_eq!(diagnostics[0].severity, Severity::Error);
    }

    #[test]
    fn applies_line_offset() {
        let diagnostics = JsLinter::new().lint("debugger;", Path::new("x.html"), 10);

        assert_eq!(diagnostics[0].line, 11);
    }

    #[test]
    fn computes_line_and_column() {
        assert_eq!(line_col("abc", 0), (1, 1));
        assert_eq!(line_col("abc\ndef", 5), (2, 2));
        assert_eq!(line_col("abc", 99), (1, 4));
    }
}
