//! Build pipeline for the Capira front end.
//!
//! Declares the production task graph (clean, copy, styles, elements, lint,
//! images, fonts, html, vulcanize), runs it stage by stage, and provides the
//! auxiliary precache and TODO generators.

pub mod assets;
pub mod builder;
pub mod context;
pub mod orchestrator;
pub mod precache;
pub mod task;
pub mod tasks;
pub mod templates;
pub mod todo;
pub mod useref;

pub use builder::{BuildError, BuildResult, Pipeline, PipelineConfig};
pub use context::{BuildContext, ConfigError, DEFAULT_BROWSERS};
pub use orchestrator::{Orchestrator, Plan, PlanError, RunReport, TaskGraph, TaskStatus};
pub use task::{FnTask, Task, TaskError, TaskReport};
