//! Task graph declaration and staged execution.
//!
//! A [`TaskGraph`] maps task names to their predecessors and actions. A
//! [`Plan`] lists the graph's tasks as ordered stages. The [`Orchestrator`]
//! runs one stage at a time, running the tasks inside a stage in parallel and
//! refusing to start the next stage once anything has failed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use rayon::prelude::*;

use crate::builder::BuildError;
use crate::context::BuildContext;
use crate::task::{FnTask, Task, TaskError, TaskReport};

/// Lifecycle of a task within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// Errors in the shape of a graph or plan. Nothing has run when these occur.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error("Task '{0}' is declared twice")]
    DuplicateTask(String),

    #[error("Unknown task '{0}'")]
    UnknownTask(String),

    #[error("Task '{task}' depends on unknown task '{predecessor}'")]
    UnknownPredecessor { task: String, predecessor: String },

    #[error("Task graph contains a cycle through '{0}'")]
    Cycle(String),

    #[error("Task '{task}' is not scheduled after its predecessor '{predecessor}'")]
    Unordered { task: String, predecessor: String },
}

struct TaskNode {
    name: String,
    predecessors: Vec<String>,
    task: Arc<dyn Task>,
}

/// Named tasks and the predecessors each one waits for.
#[derive(Default)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
    index: HashMap<String, usize>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a task and the tasks that must succeed before it runs.
    pub fn add(
        &mut self,
        task: impl Task + 'static,
        predecessors: &[&str],
    ) -> Result<(), PlanError> {
        let name = task.name().to_string();
        if self.index.contains_key(&name) {
            return Err(PlanError::DuplicateTask(name));
        }

        self.index.insert(name.clone(), self.nodes.len());
        self.nodes.push(TaskNode {
            name,
            predecessors: predecessors.iter().map(|p| p.to_string()).collect(),
            task: Arc::new(task),
        });
        Ok(())
    }

    /// Declare a task from a closure.
    pub fn add_fn<F>(&mut self, name: &str, predecessors: &[&str], action: F) -> Result<(), PlanError>
    where
        F: Fn(&BuildContext) -> Result<TaskReport, TaskError> + Send + Sync + 'static,
    {
        self.add(FnTask::new(name, action), predecessors)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Task>> {
        self.index.get(name).map(|&i| &self.nodes[i].task)
    }

    pub fn predecessors(&self, name: &str) -> Option<&[String]> {
        self.index
            .get(name)
            .map(|&i| self.nodes[i].predecessors.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Task names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check that every predecessor exists and the graph is acyclic.
    pub fn validate(&self) -> Result<(), PlanError> {
        self.topological_order().map(|_| ())
    }

    /// Task indices in an order where predecessors come first.
    fn topological_order(&self) -> Result<Vec<usize>, PlanError> {
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(self.nodes.len(), 0);
        for i in 0..self.nodes.len() {
            graph.add_node(i);
        }

        for (i, node) in self.nodes.iter().enumerate() {
            for predecessor in &node.predecessors {
                let &p = self.index.get(predecessor).ok_or_else(|| {
                    PlanError::UnknownPredecessor {
                        task: node.name.clone(),
                        predecessor: predecessor.clone(),
                    }
                })?;
                graph.add_edge(NodeIndex::new(p), NodeIndex::new(i), ());
            }
        }

        toposort(&graph, None)
            .map(|order| order.into_iter().map(|n| graph[n]).collect())
            .map_err(|cycle| PlanError::Cycle(self.nodes[graph[cycle.node_id()]].name.clone()))
    }
}

/// Ordered stages of task names. Tasks in one stage may run concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    stages: Vec<Vec<String>>,
}

impl Plan {
    pub fn new<S: Into<String>>(stages: Vec<Vec<S>>) -> Self {
        Self {
            stages: stages
                .into_iter()
                .map(|stage| stage.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// The production build:
    /// `clean → {copy, styles} → elements → {lint, images, fonts, html} → vulcanize`.
    pub fn default_build() -> Self {
        Self::new(vec![
            vec!["clean"],
            vec!["copy", "styles"],
            vec!["elements"],
            vec!["lint", "images", "fonts", "html"],
            vec!["vulcanize"],
        ])
    }

    /// Derive stages from dependency depth; ties keep declaration order.
    pub fn from_graph(graph: &TaskGraph) -> Result<Self, PlanError> {
        let order = graph.topological_order()?;
        let mut depth = vec![0usize; graph.nodes.len()];

        for i in order {
            depth[i] = graph.nodes[i]
                .predecessors
                .iter()
                .map(|p| depth[graph.index[p]] + 1)
                .max()
                .unwrap_or(0);
        }

        let levels = depth.iter().copied().max().map_or(0, |d| d + 1);
        let mut stages = vec![Vec::new(); levels];
        for (i, node) in graph.nodes.iter().enumerate() {
            stages[depth[i]].push(node.name.clone());
        }

        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Vec<String>] {
        &self.stages
    }

    /// Check the plan against a graph: every task known and listed once, and
    /// every predecessor in a strictly earlier stage.
    pub fn validate(&self, graph: &TaskGraph) -> Result<(), PlanError> {
        let mut stage_of: HashMap<&str, usize> = HashMap::new();

        for (s, stage) in self.stages.iter().enumerate() {
            for name in stage {
                if !graph.contains(name) {
                    return Err(PlanError::UnknownTask(name.clone()));
                }
                if stage_of.insert(name.as_str(), s).is_some() {
                    return Err(PlanError::DuplicateTask(name.clone()));
                }
            }
        }

        for (s, stage) in self.stages.iter().enumerate() {
            for name in stage {
                for predecessor in graph.predecessors(name).unwrap_or_default() {
                    match stage_of.get(predecessor.as_str()) {
                        Some(&p) if p < s => {}
                        _ => {
                            return Err(PlanError::Unordered {
                                task: name.clone(),
                                predecessor: predecessor.clone(),
                            })
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// The first task failure of a run.
#[derive(Debug)]
pub struct TaskFailure {
    pub task: String,
    pub error: TaskError,
}

/// Outcome of running a plan.
#[derive(Debug)]
pub struct RunReport {
    statuses: HashMap<String, TaskStatus>,
    reports: HashMap<String, TaskReport>,

    /// First failure in stage order, if any
    pub failure: Option<TaskFailure>,

    pub duration: Duration,
}

impl RunReport {
    /// Status of a task; tasks outside the plan are `Pending`.
    pub fn status(&self, name: &str) -> TaskStatus {
        self.statuses
            .get(name)
            .copied()
            .unwrap_or(TaskStatus::Pending)
    }

    pub fn report(&self, name: &str) -> Option<TaskReport> {
        self.reports.get(name).copied()
    }

    /// Sum of every successful task's output.
    pub fn total(&self) -> TaskReport {
        let mut total = TaskReport::default();
        for report in self.reports.values() {
            total.merge(*report);
        }
        total
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Turn a failed run into the error of its first failing task.
    pub fn into_result(mut self) -> Result<RunReport, BuildError> {
        match self.failure.take() {
            Some(failure) => Err(BuildError::TaskFailed {
                task: failure.task,
                source: failure.error,
            }),
            None => Ok(self),
        }
    }
}

/// Runs plans over a task graph.
#[derive(Clone)]
pub struct Orchestrator {
    graph: Arc<TaskGraph>,
    ctx: Arc<BuildContext>,
}

impl Orchestrator {
    /// Create an orchestrator after validating the graph.
    pub fn new(graph: TaskGraph, ctx: BuildContext) -> Result<Self, PlanError> {
        graph.validate()?;
        Ok(Self {
            graph: Arc::new(graph),
            ctx: Arc::new(ctx),
        })
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    /// Run a plan on a blocking worker, failing with the first task error.
    pub async fn run(&self, plan: &Plan) -> Result<RunReport, BuildError> {
        let this = self.clone();
        let plan = plan.clone();

        tokio::task::spawn_blocking(move || this.execute(&plan))
            .await
            .map_err(|e| BuildError::Worker(e.to_string()))??
            .into_result()
    }

    /// Run a single task by name, ignoring its predecessors.
    pub async fn run_task(&self, name: &str) -> Result<TaskReport, BuildError> {
        let task = self
            .graph
            .get(name)
            .cloned()
            .ok_or_else(|| BuildError::Plan(PlanError::UnknownTask(name.to_string())))?;
        let ctx = Arc::clone(&self.ctx);
        let name = name.to_string();

        tokio::task::spawn_blocking(move || {
            run_logged(task.as_ref(), &ctx)
                .map_err(|source| BuildError::TaskFailed { task: name, source })
        })
        .await
        .map_err(|e| BuildError::Worker(e.to_string()))?
    }

    /// Run a plan on the current thread, blocking until it settles.
    ///
    /// A task failure is recorded in the report rather than returned; only a
    /// malformed plan is an error.
    pub fn execute(&self, plan: &Plan) -> Result<RunReport, PlanError> {
        plan.validate(&self.graph)?;

        let start = Instant::now();
        let mut statuses: HashMap<String, TaskStatus> = plan
            .stages()
            .iter()
            .flatten()
            .map(|name| (name.clone(), TaskStatus::Pending))
            .collect();
        let mut reports = HashMap::new();
        let mut failure: Option<TaskFailure> = None;

        for (s, stage) in plan.stages().iter().enumerate() {
            if failure.is_some() {
                break;
            }

            tracing::debug!("Stage {}: {}", s + 1, stage.join(", "));
            for name in stage {
                statuses.insert(name.clone(), TaskStatus::Running);
            }

            let results: Vec<(&String, Result<TaskReport, TaskError>)> = stage
                .par_iter()
                .map(|name| {
                    // Validated above
                    let task = &self.graph.nodes[self.graph.index[name]].task;
                    (name, run_logged(task.as_ref(), &self.ctx))
                })
                .collect();

            for (name, result) in results {
                match result {
                    Ok(report) => {
                        statuses.insert(name.clone(), TaskStatus::Succeeded);
                        reports.insert(name.clone(), report);
                    }
                    Err(error) => {
                        statuses.insert(name.clone(), TaskStatus::Failed);
                        if failure.is_none() {
                            failure = Some(TaskFailure {
                                task: name.clone(),
                                error,
                            });
                        }
                    }
                }
            }
        }

        if failure.is_some() {
            // Dependents of a failed task fail without running
            for name in plan.stages().iter().flatten() {
                if statuses.get(name) != Some(&TaskStatus::Pending) {
                    continue;
                }
                let blocked = self
                    .graph
                    .predecessors(name)
                    .unwrap_or_default()
                    .iter()
                    .any(|p| statuses.get(p) == Some(&TaskStatus::Failed));
                if blocked {
                    statuses.insert(name.clone(), TaskStatus::Failed);
                }
            }
        }

        Ok(RunReport {
            statuses,
            reports,
            failure,
            duration: start.elapsed(),
        })
    }
}

fn run_logged(task: &dyn Task, ctx: &BuildContext) -> Result<TaskReport, TaskError> {
    let start = Instant::now();
    tracing::info!("Starting '{}'...", task.name());

    match task.run(ctx) {
        Ok(report) => {
            tracing::info!(
                "Finished '{}' after {}ms ({})",
                task.name(),
                start.elapsed().as_millis(),
                report
            );
            Ok(report)
        }
        Err(e) => {
            tracing::error!("'{}' errored after {}ms: {}", task.name(), start.elapsed().as_millis(), e);
            Err(e)
        }
    }
}
