//! Sequential task runner
//!
//! Executes an [`ExecutionPlan`] strictly in order. The first failure stops
//! the run: every later task is reported as skipped and its action is never
//! invoked. Cancellation is honoured between tasks only; a running action is
//! always allowed to finish.

use std::time::Instant;

use futures::future::{BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;

use crate::registry::{Task, TaskAction, TaskRegistry};
use crate::resolver::ExecutionPlan;
use crate::results::{RunReport, TaskOutcome, TaskResult};
use crate::types::SitepipeResult;

/// Runs registered tasks, sequentially or as parallel groups
pub struct TaskRunner<'a> {
    pub(crate) registry: &'a TaskRegistry,
    cancel: CancellationToken,
}

impl<'a> TaskRunner<'a> {
    pub fn new(registry: &'a TaskRegistry) -> Self {
        Self {
            registry,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop starting new tasks once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Execute `plan` in order and report every task's outcome
    pub async fn execute(&self, plan: &ExecutionPlan) -> RunReport {
        let mut report = RunReport::default();
        let mut halted = false;

        for name in plan.tasks() {
            if !halted && self.cancel.is_cancelled() {
                tracing::warn!(task = %name, "run cancelled");
                report.cancelled = true;
                halted = true;
            }
            if halted {
                tracing::debug!(task = %name, "skipped");
                report.results.push(TaskResult {
                    name: name.clone(),
                    outcome: TaskOutcome::Skipped,
                });
                continue;
            }

            let outcome = self.run_named(name).await;
            if !outcome.is_success() {
                halted = true;
            }
            report.results.push(TaskResult {
                name: name.clone(),
                outcome,
            });
        }

        report
    }

    /// Execute `plan`, failing with the first task error
    pub async fn run_sequential(&self, plan: &ExecutionPlan) -> SitepipeResult<RunReport> {
        self.execute(plan).await.into_result()
    }

    pub(crate) async fn run_named(&self, name: &str) -> TaskOutcome {
        let task = match self.registry.lookup(name) {
            Ok(task) => task,
            Err(e) => {
                return TaskOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        tracing::info!(task = %name, kind = task.action.kind(), "starting");
        let started = Instant::now();
        match self.run_action(task).await {
            Ok(()) => {
                let duration = started.elapsed();
                tracing::info!(task = %name, elapsed_ms = duration.as_millis() as u64, "finished");
                TaskOutcome::Succeeded { duration }
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                tracing::error!(task = %name, error = %reason, "failed");
                TaskOutcome::Failed { reason }
            }
        }
    }

    /// Boxed because parallel groups recurse back into the runner
    fn run_action<'b>(&'b self, task: &'b Task) -> BoxFuture<'b, anyhow::Result<()>> {
        async move {
            match &task.action {
                TaskAction::Noop => Ok(()),
                TaskAction::Run(action) => action().await,
                TaskAction::Parallel(members) => {
                    self.run_parallel(members).await?;
                    Ok(())
                }
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::plan;
    use crate::types::SitepipeError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn recording(log: &Arc<Mutex<Vec<String>>>, name: &str, fail: bool) -> TaskAction {
        let log = Arc::clone(log);
        let name = name.to_string();
        TaskAction::run(move || {
            let log = Arc::clone(&log);
            let name = name.clone();
            async move {
                log.lock().unwrap().push(name.clone());
                if fail {
                    anyhow::bail!("{} exploded", name);
                }
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_failure_skips_remaining_tasks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = TaskRegistry::new();
        registry.register("A", recording(&log, "A", false), Vec::<String>::new()).unwrap();
        registry.register("B", recording(&log, "B", true), Vec::<String>::new()).unwrap();
        registry.register("C", recording(&log, "C", false), Vec::<String>::new()).unwrap();

        let plan = plan(&registry, &["A", "B", "C"]).unwrap();
        let runner = TaskRunner::new(&registry);
        let report = runner.execute(&plan).await;

        assert!(report.outcome("A").unwrap().is_success());
        assert!(matches!(report.outcome("B"), Some(TaskOutcome::Failed { reason }) if reason.contains("B exploded")));
        assert_eq!(report.outcome("C"), Some(&TaskOutcome::Skipped));
        assert!(!report.is_success());
        assert_eq!(*log.lock().unwrap(), vec!["A", "B"]);

        let err = runner.run_sequential(&plan).await.unwrap_err();
        assert!(matches!(err, SitepipeError::TaskExecution { task, .. } if task == "B"));
    }

    #[tokio::test]
    async fn test_actions_run_in_plan_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = TaskRegistry::new();
        registry.register("contents", recording(&log, "contents", false), Vec::<String>::new()).unwrap();
        registry.register("fonts", recording(&log, "fonts", false), ["contents"]).unwrap();
        registry.register("sass", recording(&log, "sass", false), Vec::<String>::new()).unwrap();
        registry.register("default", TaskAction::Noop, ["fonts", "sass"]).unwrap();

        let plan = plan(&registry, &["default"]).unwrap();
        let report = TaskRunner::new(&registry).run_sequential(&plan).await.unwrap();

        assert!(report.is_success());
        assert_eq!(*log.lock().unwrap(), vec!["contents", "fonts", "sass"]);
    }

    #[tokio::test]
    async fn test_rerunning_a_plan_gives_same_shape() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = TaskRegistry::new();
        for name in ["clean", "copy", "publish"] {
            let counter = Arc::clone(&counter);
            registry
                .register(
                    name,
                    TaskAction::run(move || {
                        let counter = Arc::clone(&counter);
                        async move {
                            counter.fetch_add(1, Ordering::SeqCst);
                            Ok(())
                        }
                    }),
                    Vec::<String>::new(),
                )
                .unwrap();
        }
        let plan = plan(&registry, &["clean", "copy", "publish"]).unwrap();
        let runner = TaskRunner::new(&registry);

        let first = runner.run_sequential(&plan).await.unwrap();
        let second = runner.run_sequential(&plan).await.unwrap();

        assert_eq!(first.shape(), second.shape());
        assert!(first.shape().iter().all(|(_, kind)| *kind == "succeeded"));
        assert_eq!(counter.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_cancellation_between_tasks() {
        let cancel = CancellationToken::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = TaskRegistry::new();
        {
            let cancel = cancel.clone();
            let log = Arc::clone(&log);
            registry
                .register(
                    "first",
                    TaskAction::run(move || {
                        let cancel = cancel.clone();
                        let log = Arc::clone(&log);
                        async move {
                            // Cancelled mid-task: this task still completes
                            cancel.cancel();
                            log.lock().unwrap().push("first".to_string());
                            Ok(())
                        }
                    }),
                    Vec::<String>::new(),
                )
                .unwrap();
        }
        registry.register("second", recording(&log, "second", false), Vec::<String>::new()).unwrap();

        let plan = plan(&registry, &["first", "second"]).unwrap();
        let report = TaskRunner::new(&registry)
            .with_cancellation(cancel)
            .execute(&plan)
            .await;

        assert!(report.cancelled);
        assert!(report.outcome("first").unwrap().is_success());
        assert_eq!(report.outcome("second"), Some(&TaskOutcome::Skipped));
        assert_eq!(*log.lock().unwrap(), vec!["first"]);
        assert!(matches!(report.into_result(), Err(SitepipeError::Cancelled(name)) if name == "second"));
    }
}
