//! Parallel group runner
//!
//! Every member of a group is started at once and awaited together. A failing
//! member never cancels its siblings: build steps write files, and a step
//! abandoned half-way leaves the output directory in a worse state than a
//! finished one. All failures are collected into one aggregate error.

use futures::future::join_all;

use crate::execution::runner::TaskRunner;
use crate::results::{RunReport, TaskResult};
use crate::types::{SitepipeError, SitepipeResult};

impl<'a> TaskRunner<'a> {
    /// Run `task_names` concurrently and wait for all of them
    pub async fn run_parallel<S: AsRef<str>>(&self, task_names: &[S]) -> SitepipeResult<RunReport> {
        // Unknown names are a registration error, reported before anything starts
        for name in task_names {
            self.registry.lookup(name.as_ref())?;
        }

        tracing::debug!(
            tasks = %task_names.iter().map(|n| n.as_ref()).collect::<Vec<_>>().join(", "),
            "starting parallel group"
        );

        let outcomes = join_all(task_names.iter().map(|name| self.run_named(name.as_ref()))).await;

        let report = RunReport {
            results: task_names
                .iter()
                .zip(outcomes)
                .map(|(name, outcome)| TaskResult {
                    name: name.as_ref().to_string(),
                    outcome,
                })
                .collect(),
            cancelled: false,
        };

        let failures = report.failures();
        if failures.is_empty() {
            Ok(report)
        } else {
            Err(SitepipeError::AggregateTask { failures })
        }
    }
}
