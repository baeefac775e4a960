//! Dependency resolution
//!
//! Expands requested task names into an [`ExecutionPlan`]: a depth-first,
//! post-order walk that emits every prerequisite before its dependent, each
//! task at most once. Ties are broken by prerequisite declaration order, so
//! a plan is fully determined by the registry and the requested order.

use std::collections::{HashMap, HashSet};

use crate::registry::{TaskAction, TaskRegistry};
use crate::types::{SitepipeError, SitepipeResult};

/// Dependency-respecting order of tasks for one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    tasks: Vec<String>,
}

impl ExecutionPlan {
    pub fn tasks(&self) -> &[String] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.iter().any(|t| t == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t == name)
    }
}

impl FromIterator<String> for ExecutionPlan {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            tasks: iter.into_iter().collect(),
        }
    }
}

struct Walk<'a> {
    registry: &'a TaskRegistry,
    visiting: Vec<String>,
    emitted: HashSet<String>,
    // group member -> outermost group that runs it
    covered: HashMap<String, String>,
    order: Vec<String>,
}

impl<'a> Walk<'a> {
    fn enter(&mut self, name: &str) -> SitepipeResult<()> {
        if let Some(start) = self.visiting.iter().position(|v| v == name) {
            let mut cycle = self.visiting[start..].to_vec();
            cycle.push(name.to_string());
            return Err(SitepipeError::CyclicDependency(cycle));
        }
        self.visiting.push(name.to_string());
        Ok(())
    }

    fn visit(&mut self, name: &str) -> SitepipeResult<()> {
        if self.emitted.contains(name) {
            return Ok(());
        }
        if let Some(group) = self.covered.get(name) {
            return Err(overlap(name, group));
        }
        let task = self.registry.lookup(name)?;
        self.enter(name)?;

        for prerequisite in &task.prerequisites {
            self.visit(prerequisite)?;
        }

        // Group members run inside the group, but whatever they need must come first
        if let TaskAction::Parallel(members) = &task.action {
            for member in members {
                self.visit_member(member, name)?;
            }
        }

        self.visiting.pop();
        self.emitted.insert(name.to_string());
        self.order.push(name.to_string());
        Ok(())
    }

    fn visit_member(&mut self, name: &str, group: &str) -> SitepipeResult<()> {
        if self.emitted.contains(name) || self.covered.contains_key(name) {
            return Err(overlap(name, group));
        }
        let task = self.registry.lookup(name)?;
        self.enter(name)?;
        self.covered.insert(name.to_string(), group.to_string());
        for prerequisite in &task.prerequisites {
            self.visit(prerequisite)?;
        }
        if let TaskAction::Parallel(members) = &task.action {
            for member in members {
                self.visit_member(member, group)?;
            }
        }
        self.visiting.pop();
        Ok(())
    }
}

fn overlap(member: &str, group: &str) -> SitepipeError {
    SitepipeError::Config(format!(
        "task '{}' is planned more than once: on its own and inside parallel group '{}'",
        member, group
    ))
}

/// Resolve `requested` (in order) into an execution plan
pub fn plan<S: AsRef<str>>(registry: &TaskRegistry, requested: &[S]) -> SitepipeResult<ExecutionPlan> {
    let mut walk = Walk {
        registry,
        visiting: Vec::new(),
        emitted: HashSet::new(),
        covered: HashMap::new(),
        order: Vec::new(),
    };
    for name in requested {
        walk.visit(name.as_ref())?;
    }
    Ok(ExecutionPlan { tasks: walk.order })
}
