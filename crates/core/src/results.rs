//! Result types for site manager operations
//!
//! This module contains the result types returned by [`SiteManager`](crate::SiteManager)
//! operations and by the runners, in one place.

use std::collections::HashMap;
use std::time::Duration;

use colored::Color;

use crate::resolver::ExecutionPlan;
use crate::types::{SitepipeError, SitepipeResult};

/// Outcome of a single planned task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded { duration: Duration },
    Failed { reason: String },
    /// Not started because an earlier task failed or the run was cancelled
    Skipped,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub name: String,
    pub outcome: TaskOutcome,
}

/// Per-task outcomes of one run, in plan order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub results: Vec<TaskResult>,
    pub cancelled: bool,
}

impl RunReport {
    /// A run succeeds only if every planned task succeeded
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.results.iter().all(|r| r.outcome.is_success())
    }

    pub fn outcome(&self, name: &str) -> Option<&TaskOutcome> {
        self.results.iter().find(|r| r.name == name).map(|r| &r.outcome)
    }

    pub fn failures(&self) -> Vec<(String, String)> {
        self.results
            .iter()
            .filter_map(|r| match &r.outcome {
                TaskOutcome::Failed { reason } => Some((r.name.clone(), reason.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.outcome == TaskOutcome::Skipped)
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Outcome kinds without timings, for comparing two runs of one plan
    pub fn shape(&self) -> Vec<(&str, &'static str)> {
        self.results
            .iter()
            .map(|r| {
                let kind = match r.outcome {
                    TaskOutcome::Succeeded { .. } => "succeeded",
                    TaskOutcome::Failed { .. } => "failed",
                    TaskOutcome::Skipped => "skipped",
                };
                (r.name.as_str(), kind)
            })
            .collect()
    }

    /// Turn a sequential run into the first failure, if any
    pub fn into_result(self) -> SitepipeResult<RunReport> {
        if let Some((task, cause)) = self.failures().into_iter().next() {
            return Err(SitepipeError::TaskExecution { task, cause });
        }
        if self.cancelled {
            let next = self.skipped().first().map(|s| s.to_string()).unwrap_or_default();
            return Err(SitepipeError::Cancelled(next));
        }
        Ok(self)
    }
}

/// Information about a registered task
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: String,
    pub description: Option<String>,
    pub kind: &'static str,
    pub prerequisites: Vec<String>,
    pub members: Vec<String>,
}

/// Result of listing the registered tasks
#[derive(Debug)]
pub struct TaskListResult {
    pub tasks: Vec<TaskInfo>,
    pub task_colors: HashMap<String, Color>,
}

/// Result of getting the task graph
#[derive(Debug)]
pub struct DependencyGraphResult {
    pub graph: petgraph::Graph<String, ()>,
    pub cycles: Vec<Vec<String>>,
}

/// Result of task execution planning
#[derive(Debug)]
pub struct TaskPlanResult {
    pub plan: ExecutionPlan,
    /// Plan split into levels whose tasks do not depend on each other
    pub levels: Vec<Vec<String>>,
    /// Whether any planned task needs file-transfer credentials
    pub needs_transfer: bool,
    /// Whether the credentials those tasks need are all set
    pub transfer_ready: bool,
    pub task_colors: HashMap<String, Color>,
}
