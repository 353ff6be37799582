//! Script linting for the front-end sources.
//!
//! Checks standalone `.js` files and the inline `<script>` blocks of HTML
//! element definitions, reporting diagnostics with file positions.

pub mod extract;
pub mod js;
pub mod runner;
pub mod traits;

pub use extract::{extract_scripts, ScriptBlock};
pub use js::JsLinter;
pub use runner::{lint_files, LintReport};
pub use traits::{Diagnostic, LintError, Linter, Severity};
