use petgraph::algo::kosaraju_scc;
use petgraph::prelude::*;
use std::collections::HashMap;

use crate::registry::{TaskAction, TaskRegistry};

/// Build the task graph from the registry.
///
/// Edges point from a task to each task it needs: its prerequisites and, for
/// parallel groups, its members.
pub fn build_task_graph(registry: &TaskRegistry) -> DiGraph<String, ()> {
    let mut graph = DiGraph::<String, ()>::new();
    let mut node_indices = HashMap::new();

    for task in registry.iter() {
        let node_index = graph.add_node(task.name.clone());
        node_indices.insert(task.name.clone(), node_index);
    }

    for task in registry.iter() {
        let from_node = node_indices[&task.name];
        for dep in task.references() {
            // Registration guarantees every reference exists
            if let Some(&to_node) = node_indices.get(dep) {
                graph.add_edge(from_node, to_node, ());
            }
        }
    }

    graph
}

/// Detect cycles using strongly connected components
pub fn find_cycles(graph: &DiGraph<String, ()>) -> Vec<Vec<String>> {
    let mut cycles: Vec<Vec<String>> = kosaraju_scc(graph)
        .into_iter()
        .filter_map(|component| {
            if component.len() > 1 {
                let mut cycle = component
                    .iter()
                    .map(|node| graph[*node].clone())
                    .collect::<Vec<_>>();
                cycle.sort();
                Some(cycle)
            } else {
                let node = component[0];
                if graph.contains_edge(node, node) {
                    Some(vec![graph[node].clone()])
                } else {
                    None
                }
            }
        })
        .collect();

    cycles.sort();
    cycles
}

/// Direct dependencies of each task, split by kind, for display
pub fn describe_edges(registry: &TaskRegistry) -> Vec<(String, Vec<String>, Vec<String>)> {
    registry
        .iter()
        .map(|task| {
            let members = match &task.action {
                TaskAction::Parallel(members) => members.clone(),
                _ => Vec::new(),
            };
            (task.name.clone(), task.prerequisites.clone(), members)
        })
        .collect()
}
