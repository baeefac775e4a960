//! Dependency level grouping
//!
//! Splits an execution plan into topological levels. Tasks sharing a level do
//! not depend on each other, which tells a reader which parts of a
//! sequential plan could safely run as a parallel group.

use std::collections::HashMap;

use crate::registry::TaskRegistry;
use crate::resolver::ExecutionPlan;
use crate::types::SitepipeResult;

/// Group planned tasks by their dependency levels, prerequisites first
pub fn group_by_dependency_levels(
    registry: &TaskRegistry,
    plan: &ExecutionPlan,
) -> SitepipeResult<Vec<Vec<String>>> {
    let mut level_of: HashMap<&str, usize> = HashMap::new();
    let mut levels: Vec<Vec<String>> = Vec::new();

    // Plan order already puts prerequisites first, so one pass suffices
    for name in plan.tasks() {
        let task = registry.lookup(name)?;
        let level = task
            .prerequisites
            .iter()
            .filter_map(|p| level_of.get(p.as_str()))
            .map(|l| l + 1)
            .max()
            .unwrap_or(0);

        level_of.insert(name.as_str(), level);
        if levels.len() <= level {
            levels.resize_with(level + 1, Vec::new);
        }
        levels[level].push(name.clone());
    }

    Ok(levels)
}
