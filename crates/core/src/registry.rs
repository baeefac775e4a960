//! Task registry
//!
//! Tasks are registered once at start-up and never change afterwards. A task
//! may only name prerequisites (or parallel group members) that are already
//! registered, so [`TaskRegistry::register`] can never introduce a cycle.
//! [`TaskRegistry::register_batch`] relaxes that rule inside one batch for
//! tasks read from configuration, and checks the result for cycles instead.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::resolver;
use crate::types::{SitepipeError, SitepipeResult};

pub type TaskFuture = BoxFuture<'static, anyhow::Result<()>>;
pub type ActionFn = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// What a task does when it runs
#[derive(Clone)]
pub enum TaskAction {
    /// Nothing; the task only exists to group its prerequisites
    Noop,
    Run(ActionFn),
    /// Run the named tasks concurrently through the parallel group runner
    Parallel(Vec<String>),
}

impl TaskAction {
    pub fn run<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        TaskAction::Run(Arc::new(move || -> TaskFuture { Box::pin(f()) }))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TaskAction::Noop => "composite",
            TaskAction::Run(_) => "action",
            TaskAction::Parallel(_) => "parallel",
        }
    }
}

impl fmt::Debug for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskAction::Noop => write!(f, "Noop"),
            TaskAction::Run(_) => write!(f, "Run(..)"),
            TaskAction::Parallel(members) => f.debug_tuple("Parallel").field(members).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub description: Option<String>,
    pub prerequisites: Vec<String>,
    pub action: TaskAction,
}

impl Task {
    pub fn new(name: impl Into<String>, action: TaskAction) -> Self {
        Self {
            name: name.into(),
            description: None,
            prerequisites: Vec::new(),
            action,
        }
    }

    pub fn with_prerequisites<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites = prerequisites.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Tasks that must be registered before this one
    pub fn references(&self) -> impl Iterator<Item = &String> {
        let members: &[String] = match &self.action {
            TaskAction::Parallel(members) => members,
            _ => &[],
        };
        self.prerequisites.iter().chain(members.iter())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` with its action and prerequisites
    pub fn register<I, S>(
        &mut self,
        name: impl Into<String>,
        action: TaskAction,
        prerequisites: I,
    ) -> SitepipeResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register_task(Task::new(name, action).with_prerequisites(prerequisites))
    }

    pub fn register_task(&mut self, task: Task) -> SitepipeResult<()> {
        if self.contains(&task.name) {
            return Err(SitepipeError::DuplicateTask(task.name));
        }
        if let Some(missing) = task.references().find(|r| !self.contains(r)) {
            return Err(SitepipeError::UnknownPrerequisite {
                task: task.name.clone(),
                prerequisite: missing.clone(),
            });
        }
        let name = task.name.clone();
        self.insert(task);
        if let Err(e) = resolver::plan(self, &[name.as_str()]) {
            self.tasks.pop();
            self.index.remove(&name);
            return Err(e);
        }
        Ok(())
    }

    /// Register several tasks that may refer to each other in any order.
    ///
    /// The registry is left untouched if any task is a duplicate, refers to
    /// an unknown task, closes a cycle, or would run a parallel group member
    /// twice.
    pub fn register_batch(&mut self, tasks: Vec<Task>) -> SitepipeResult<()> {
        let mut batch_names = HashSet::new();
        for task in &tasks {
            if self.contains(&task.name) || !batch_names.insert(task.name.as_str()) {
                return Err(SitepipeError::DuplicateTask(task.name.clone()));
            }
        }
        for task in &tasks {
            if let Some(missing) = task
                .references()
                .find(|r| !self.contains(r) && !batch_names.contains(r.as_str()))
            {
                return Err(SitepipeError::UnknownPrerequisite {
                    task: task.name.clone(),
                    prerequisite: missing.clone(),
                });
            }
        }

        let mut candidate = self.clone();
        for task in tasks {
            candidate.insert(task);
        }
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> SitepipeResult<&Task> {
        self.index
            .get(name)
            .map(|&i| &self.tasks[i])
            .ok_or_else(|| SitepipeError::UnknownTask(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tasks in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Plan every registered task on its own, surfacing cycles and group
    /// overlaps before execution
    pub fn validate(&self) -> SitepipeResult<()> {
        for task in &self.tasks {
            resolver::plan(self, &[task.name.as_str()])?;
        }
        Ok(())
    }

    fn insert(&mut self, task: Task) {
        self.index.insert(task.name.clone(), self.tasks.len());
        self.tasks.push(task);
    }
}
