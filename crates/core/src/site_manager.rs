//! High-level site management interface
//!
//! This module provides the [`SiteManager`] which serves as the primary interface
//! for all site operations. It encapsulates configuration loading, task
//! registration, planning, execution and the watch loop.
//!
//! The SiteManager abstracts away the complexity of:
//! - Loading the site settings and the optional pipeline file
//! - Wiring the concrete collaborators (transform tools, git, lftp, live reload)
//! - Registering the built-in and custom tasks
//! - Planning, credential preflight and sequential execution
//!
//! ## Example
//!
//! ```rust,no_run
//! use sitepipe_core::site_manager::{SiteManager, SiteManagerConfig};
//! use std::path::PathBuf;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> sitepipe_core::types::SitepipeResult<()> {
//! let manager = SiteManager::new(SiteManagerConfig {
//!     site_root: PathBuf::from("."),
//! })?;
//!
//! // Show what `build` would do
//! let plan = manager.get_execution_plan(&["build"])?;
//! println!("{:?}", plan.plan.tasks());
//!
//! // Run it
//! let report = manager.run(&["build"], CancellationToken::new()).await?;
//! report.into_result()?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sitepipe_collaborators::LiveReload;
use tokio_util::sync::CancellationToken;

use crate::configs::pipeline::{load_pipeline_config, PipelineConfig};
use crate::configs::site::SiteConfig;
use crate::execution::levels::group_by_dependency_levels;
use crate::execution::runner::TaskRunner;
use crate::graph::{build_task_graph, find_cycles};
use crate::pipeline::{needs_transfer, Collaborators, SitePipeline};
use crate::registry::{TaskAction, TaskRegistry};
use crate::resolver::{plan, ExecutionPlan};
use crate::results::{DependencyGraphResult, RunReport, TaskInfo, TaskListResult, TaskPlanResult};
use crate::tasks::task_colors;
use crate::types::SitepipeResult;
use crate::watch::{bindings_from_config, watch_filesystem, WatchBinding, WatchCoordinator, WatchSummary};

/// Target run when none is named
pub const DEFAULT_TARGET: &str = "default";

/// Not a registered task: `default`, then live reload and the watch loop
pub const WATCH_TARGET: &str = "watch";

/// Task that starts live reload for the watch loop
const WATCH_SERVE_TASK: &str = "serve";

/// High-level site manager that encapsulates all site operations
pub struct SiteManager {
    pub site: SiteConfig,
    pub pipeline_config: PipelineConfig,
    pipeline: SitePipeline,
    reload: Arc<dyn LiveReload>,
    bindings: Vec<WatchBinding>,
    debounce: Duration,
}

/// Configuration for initializing a site manager
pub struct SiteManagerConfig {
    pub site_root: PathBuf,
}

impl SiteManager {
    /// Initialize a site manager with the real backends
    pub fn new(config: SiteManagerConfig) -> SitepipeResult<Self> {
        let site = SiteConfig::load(&config.site_root)?;
        let pipeline_config = load_pipeline_config(&config.site_root)?;
        let collaborators = Collaborators::from_config(&site, &pipeline_config)?;
        Self::with_collaborators(site, pipeline_config, collaborators)
    }

    /// Initialize a site manager around the given collaborators
    pub fn with_collaborators(
        site: SiteConfig,
        pipeline_config: PipelineConfig,
        collaborators: Collaborators,
    ) -> SitepipeResult<Self> {
        let reload = Arc::clone(&collaborators.reload);
        let pipeline = SitePipeline::build(&site, &pipeline_config, collaborators)?;

        let (bindings, debounce) = bindings_from_config(&site, pipeline_config.watch.as_ref())?;
        for binding in &bindings {
            plan(pipeline.registry(), binding.tasks())?;
        }

        Ok(Self {
            site,
            pipeline_config,
            pipeline,
            reload,
            bindings,
            debounce,
        })
    }

    pub fn registry(&self) -> &TaskRegistry {
        self.pipeline.registry()
    }

    pub fn watch_bindings(&self) -> &[WatchBinding] {
        &self.bindings
    }

    /// List every registered task in registration order
    pub fn list_tasks(&self) -> TaskListResult {
        let tasks: Vec<TaskInfo> = self
            .registry()
            .iter()
            .map(|task| TaskInfo {
                name: task.name.clone(),
                description: task.description.clone(),
                kind: task.action.kind(),
                prerequisites: task.prerequisites.clone(),
                members: match &task.action {
                    TaskAction::Parallel(members) => members.clone(),
                    _ => Vec::new(),
                },
            })
            .collect();

        TaskListResult {
            task_colors: task_colors(tasks.iter().map(|t| &t.name)),
            tasks,
        }
    }

    /// Resolve `targets` into an execution plan without running anything
    pub fn get_execution_plan<S: AsRef<str>>(&self, targets: &[S]) -> SitepipeResult<TaskPlanResult> {
        let plan = plan(self.registry(), targets)?;
        let levels = group_by_dependency_levels(self.registry(), &plan)?;
        let needs_transfer = needs_transfer(&plan);
        Ok(TaskPlanResult {
            needs_transfer,
            transfer_ready: needs_transfer && self.site.ftp.is_configured(),
            task_colors: task_colors(plan.tasks()),
            levels,
            plan,
        })
    }

    /// Plan and run `targets`, stopping at the first failure.
    ///
    /// Configuration problems (unknown targets, missing credentials for a
    /// planned transfer) fail before any task starts. Task failures and
    /// cancellation are recorded in the returned report.
    pub async fn run<S: AsRef<str>>(
        &self,
        targets: &[S],
        cancel: CancellationToken,
    ) -> SitepipeResult<RunReport> {
        let plan = plan(self.registry(), targets)?;
        self.preflight(&plan)?;

        tracing::info!(tasks = plan.len(), "running plan");
        let report = TaskRunner::new(self.registry())
            .with_cancellation(cancel)
            .execute(&plan)
            .await;
        Ok(report)
    }

    /// Get the task graph and any cycles in it
    pub fn get_dependency_graph(&self) -> DependencyGraphResult {
        let graph = build_task_graph(self.registry());
        let cycles = find_cycles(&graph);
        DependencyGraphResult { graph, cycles }
    }

    /// Debounce loop over this site's bindings, not yet attached to an event source
    pub fn watch_coordinator(&self, cancel: CancellationToken) -> SitepipeResult<WatchCoordinator<'_>> {
        Ok(
            WatchCoordinator::new(self.registry(), self.bindings.clone(), self.debounce)?
                .with_reload(Arc::clone(&self.reload))
                .with_cancellation(cancel),
        )
    }

    /// Run `default`, start live reload, then rebuild on changes until cancelled
    pub async fn watch(&self, cancel: CancellationToken) -> SitepipeResult<WatchSummary> {
        self.run(&[DEFAULT_TARGET, WATCH_SERVE_TASK], cancel.clone())
            .await?
            .into_result()?;

        let (_watcher, events) = watch_filesystem(&self.site.root)?;
        self.watch_coordinator(cancel)?.run(events).await
    }

    fn preflight(&self, plan: &ExecutionPlan) -> SitepipeResult<()> {
        if needs_transfer(plan) {
            self.site.ftp.credentials()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs::pipeline::parse_pipeline_config;
    use crate::pipeline::fakes::{self, CallLog};
    use crate::results::TaskOutcome;
    use crate::types::SitepipeError;
    use std::path::Path;
    use std::sync::Mutex;

    fn manager(root: &Path, log: &CallLog) -> SiteManager {
        let site = SiteConfig::from_lookup(root, |_| None).unwrap();
        SiteManager::with_collaborators(site, PipelineConfig::default(), fakes::collaborators(root, log, true))
            .unwrap()
    }

    #[test]
    fn test_list_tasks_includes_composites_and_groups() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let list = manager(temp_dir.path(), &log).list_tasks();

        let build = list.tasks.iter().find(|t| t.name == "build").unwrap();
        assert_eq!(build.kind, "composite");
        let uglify = list.tasks.iter().find(|t| t.name == "uglify").unwrap();
        assert_eq!(uglify.members, vec!["uglify:js", "uglify:css"]);
        assert_eq!(list.task_colors.len(), list.tasks.len());
    }

    #[test]
    fn test_plan_reports_levels_and_transfer() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let manager = manager(temp_dir.path(), &log);

        let result = manager.get_execution_plan(&["build:ftp"]).unwrap();
        assert!(result.needs_transfer);
        assert!(!result.transfer_ready);
        let total: usize = result.levels.iter().map(Vec::len).sum();
        assert_eq!(total, result.plan.len());

        let result = manager.get_execution_plan(&["default"]).unwrap();
        assert!(!result.needs_transfer);
    }

    #[test]
    fn test_plan_reports_ready_transfer_when_credentials_are_set() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let site = SiteConfig::from_lookup(temp_dir.path(), |key| match key {
            "FTP_HOST" => Some("ftp.example.com".to_string()),
            "FTP_USER" => Some("deploy".to_string()),
            "FTP_PASSWORD" => Some("secret".to_string()),
            _ => None,
        })
        .unwrap();
        let manager = SiteManager::with_collaborators(
            site,
            PipelineConfig::default(),
            fakes::collaborators(temp_dir.path(), &log, true),
        )
        .unwrap();

        let result = manager.get_execution_plan(&["build:ftp"]).unwrap();
        assert!(result.needs_transfer);
        assert!(result.transfer_ready);
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_any_task() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let manager = manager(temp_dir.path(), &log);

        let err = manager
            .run(&["build:ftp"], CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SitepipeError::Config(msg) if msg.contains("FTP_HOST")));
        assert!(log.lock().unwrap().is_empty());

        // Credentials are irrelevant when nothing transfers
        let report = manager
            .run(&["default"], CancellationToken::new())
            .await
            .unwrap();
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_cancelled_run_skips_everything() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let manager = manager(temp_dir.path(), &log);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = manager.run(&["build"], cancel).await.unwrap();
        assert!(report.cancelled);
        assert!(report
            .results
            .iter()
            .all(|r| r.outcome == TaskOutcome::Skipped));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_watch_binding_to_unknown_task_is_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let site = SiteConfig::from_lookup(temp_dir.path(), |_| None).unwrap();
        let pipeline_config = parse_pipeline_config(
            "watch:\n  bindings:\n    - patterns: ['**/*.ts']\n      tasks: [typescript]\n",
        )
        .unwrap();
        let err = SiteManager::with_collaborators(
            site,
            pipeline_config,
            fakes::collaborators(temp_dir.path(), &log, false),
        )
        .err()
        .unwrap();
        assert!(matches!(err, SitepipeError::UnknownTask(name) if name == "typescript"));
    }

    #[test]
    fn test_dependency_graph_has_no_cycles() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let graph = manager(temp_dir.path(), &log).get_dependency_graph();
        assert!(graph.cycles.is_empty());
        assert!(graph.graph.node_count() > 30);
    }
}
