//! The production build pipeline.

use std::path::PathBuf;
use std::time::Instant;

use crate::context::{BuildContext, ConfigError, DEFAULT_BROWSERS};
use crate::orchestrator::{Orchestrator, Plan, PlanError, RunReport};
use crate::task::{TaskError, TaskReport};
use crate::precache;
use crate::tasks;

/// Configuration for the asset pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Project root; relative paths below resolve against it
    pub root: PathBuf,

    /// Source tree
    pub src_dir: PathBuf,

    /// Distribution output
    pub dist_dir: PathBuf,

    /// Intermediate output
    pub tmp_dir: PathBuf,

    /// Bower packages copied into the output
    pub bower_dir: PathBuf,

    /// Image optimization cache
    pub cache_dir: PathBuf,

    /// Minify CSS and HTML output
    pub minify: bool,

    /// Browser support queries for vendor prefixing
    pub browsers: Vec<String>,

    /// Fail the build on lint errors
    pub lint_fail_on_error: bool,

    /// Skip unchanged stylesheets
    pub incremental: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            src_dir: PathBuf::from("src"),
            dist_dir: PathBuf::from("dist"),
            tmp_dir: PathBuf::from(".tmp"),
            bower_dir: PathBuf::from("bower_components"),
            cache_dir: PathBuf::from(".capira-cache"),
            minify: true,
            browsers: DEFAULT_BROWSERS.iter().map(|b| b.to_string()).collect(),
            lint_fail_on_error: true,
            incremental: false,
        }
    }
}

/// Result of a build.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of tasks that ran
    pub tasks: usize,

    /// Files and bytes written
    pub output: TaskReport,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during a build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("Task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: TaskError,
    },

    #[error("Failed to write {path}: {message}")]
    WriteError { path: PathBuf, message: String },

    #[error("Failed to render template: {0}")]
    TemplateError(String),

    #[error("Build worker failed: {0}")]
    Worker(String),
}

/// The asset pipeline: the standard task graph bound to a configuration.
#[derive(Clone)]
pub struct Pipeline {
    orchestrator: Orchestrator,
}

impl Pipeline {
    /// Create a pipeline with the standard task graph.
    pub fn new(config: PipelineConfig) -> Result<Self, BuildError> {
        let ctx = BuildContext::new(&config)?;
        let orchestrator = Orchestrator::new(tasks::standard_graph()?, ctx)?;
        Ok(Self { orchestrator })
    }

    pub fn context(&self) -> &BuildContext {
        self.orchestrator.context()
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Run the default production build.
    pub async fn build(&self) -> Result<BuildResult, BuildError> {
        self.build_with(&Plan::default_build()).await
    }

    /// Run an arbitrary plan over the standard graph.
    pub async fn build_with(&self, plan: &Plan) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let report: RunReport = self.orchestrator.run(plan).await?;

        Ok(BuildResult {
            tasks: plan.stages().iter().map(Vec::len).sum(),
            output: report.total(),
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: self.context().dist_dir.clone(),
        })
    }

    /// Run one task on its own, e.g. `clean` or a watch-triggered `styles`.
    pub async fn run_task(&self, name: &str) -> Result<TaskReport, BuildError> {
        self.orchestrator.run_task(name).await
    }

    /// Write `precache.json` for the current distribution tree.
    pub fn precache(&self) -> Result<PathBuf, BuildError> {
        let (path, _) = precache::write_precache(&self.context().dist_dir).map_err(|source| {
            BuildError::TaskFailed {
                task: "precache".to_string(),
                source,
            }
        })?;
        Ok(path)
    }
}
