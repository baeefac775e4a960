//! Debounced rebuild loop
//!
//! Every binding is its own little state machine: idle until a matching
//! change arrives, then debouncing until the window passes without another
//! matching change, then triggered. A trigger plans the binding's tasks, runs
//! them through the sequential runner and, if they all succeed, pushes the
//! changed paths to the live-reload collaborator.
//!
//! The coordinator is the only owner of its timers. Rebuilds run one at a
//! time; events that arrive during a rebuild queue up on the channel and are
//! routed once it finishes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sitepipe_collaborators::LiveReload;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::execution::runner::TaskRunner;
use crate::registry::TaskRegistry;
use crate::resolver;
use crate::types::SitepipeResult;
use crate::watch::binding::WatchBinding;

/// One batch of filesystem changes, paths relative to the site root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchEvent {
    pub paths: Vec<PathBuf>,
}

impl WatchEvent {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

/// Counters reported when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    pub triggers: usize,
    pub failures: usize,
}

#[derive(Debug)]
struct Pending {
    deadline: Instant,
    paths: Vec<PathBuf>,
}

pub struct WatchCoordinator<'a> {
    registry: &'a TaskRegistry,
    bindings: Vec<WatchBinding>,
    debounce: Duration,
    reload: Option<Arc<dyn LiveReload>>,
    cancel: CancellationToken,
}

impl<'a> WatchCoordinator<'a> {
    /// Fails with `UnknownTask` if a binding names a task that is not registered
    pub fn new(
        registry: &'a TaskRegistry,
        bindings: Vec<WatchBinding>,
        debounce: Duration,
    ) -> SitepipeResult<Self> {
        for binding in &bindings {
            resolver::plan(registry, binding.tasks())?;
        }
        Ok(Self {
            registry,
            bindings,
            debounce,
            reload: None,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_reload(mut self, reload: Arc<dyn LiveReload>) -> Self {
        self.reload = Some(reload);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn bindings(&self) -> &[WatchBinding] {
        &self.bindings
    }

    /// Consume events until the channel closes or the loop is cancelled.
    ///
    /// When the channel closes, bindings still inside their window are
    /// triggered immediately instead of being dropped.
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<WatchEvent>) -> SitepipeResult<WatchSummary> {
        let mut pending: Vec<Option<Pending>> = self.bindings.iter().map(|_| None).collect();
        let mut summary = WatchSummary::default();

        tracing::info!(
            bindings = self.bindings.len(),
            debounce_ms = self.debounce.as_millis() as u64,
            "watching for changes"
        );

        loop {
            let next_deadline = pending.iter().flatten().map(|p| p.deadline).min();
            let timer = tokio::time::sleep_until(next_deadline.unwrap_or_else(Instant::now));

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::info!("watch cancelled");
                    break;
                }
                received = events.recv() => match received {
                    Some(event) => self.route(&mut pending, event),
                    None => {
                        tracing::debug!("watch event source closed");
                        for index in 0..pending.len() {
                            if let Some(due) = pending[index].take() {
                                self.trigger(index, due.paths, &mut summary).await?;
                            }
                        }
                        break;
                    }
                },
                _ = timer, if next_deadline.is_some() => {
                    let now = Instant::now();
                    for index in 0..pending.len() {
                        let is_due = pending[index].as_ref().map(|p| p.deadline <= now).unwrap_or(false);
                        if is_due {
                            if let Some(due) = pending[index].take() {
                                self.trigger(index, due.paths, &mut summary).await?;
                            }
                        }
                    }
                }
            }
        }

        Ok(summary)
    }

    /// Open or restart the window of every binding the event matches
    fn route(&self, pending: &mut [Option<Pending>], event: WatchEvent) {
        let deadline = Instant::now() + self.debounce;
        for (binding, slot) in self.bindings.iter().zip(pending.iter_mut()) {
            let matched: Vec<PathBuf> = event
                .paths
                .iter()
                .filter(|p| binding.matches(p))
                .cloned()
                .collect();
            if matched.is_empty() {
                continue;
            }

            tracing::debug!(tasks = %binding.tasks().join(", "), paths = matched.len(), "change matched");
            match slot {
                Some(window) => {
                    window.deadline = deadline;
                    for path in matched {
                        if !window.paths.contains(&path) {
                            window.paths.push(path);
                        }
                    }
                }
                None => {
                    *slot = Some(Pending {
                        deadline,
                        paths: matched,
                    });
                }
            }
        }
    }

    async fn trigger(&self, index: usize, paths: Vec<PathBuf>, summary: &mut WatchSummary) -> SitepipeResult<()> {
        let binding = &self.bindings[index];
        tracing::info!(tasks = %binding.tasks().join(", "), "rebuilding");

        let plan = resolver::plan(self.registry, binding.tasks())?;
        let report = TaskRunner::new(self.registry)
            .with_cancellation(self.cancel.child_token())
            .execute(&plan)
            .await;

        if report.is_success() {
            summary.triggers += 1;
            if let Some(reload) = &self.reload {
                reload.notify(&paths);
            }
        } else if !report.cancelled {
            // A failed rebuild keeps the loop alive; the next change retries it
            summary.failures += 1;
            for (task, cause) in report.failures() {
                tracing::error!(task = %task, error = %cause, "rebuild failed");
            }
        }
        Ok(())
    }
}
