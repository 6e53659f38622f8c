// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::errors::{ParbuildError, Result};
use crate::task::{TaskName, TaskRegistry};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct dependencies: tasks that must succeed before this one runs.
    deps: Vec<TaskName>,
    /// Direct dependents, in registration order.
    dependents: Vec<TaskName>,
}

/// In-memory DAG of a registry, keyed by task name.
///
/// Construction validates the graph, so every `DagGraph` is known to be
/// acyclic with resolvable edges.
#[derive(Debug, Clone)]
pub struct DagGraph {
    /// Task names in registration order.
    order: Vec<TaskName>,
    nodes: HashMap<TaskName, DagNode>,
}

impl DagGraph {
    /// Build the DAG for a registry.
    ///
    /// If `sequential_group` is given, every member of that group gets an
    /// extra edge from the previous member (registration order), so the group
    /// runs one task at a time and stops at the first failure.
    pub fn from_registry(registry: &TaskRegistry, sequential_group: Option<&str>) -> Result<Self> {
        let mut order = Vec::with_capacity(registry.len());
        let mut nodes: HashMap<TaskName, DagNode> = HashMap::new();
        let mut previous_in_group: Option<&str> = None;

        for task in registry.all_tasks() {
            let mut deps = task.prerequisites.clone();

            if let (Some(group), Some(own)) = (sequential_group, task.group.as_deref()) {
                if group == own {
                    if let Some(prev) = previous_in_group {
                        if !deps.iter().any(|d| d == prev) {
                            debug!(task = %task.name, after = %prev, "serialising group member");
                            deps.push(prev.to_string());
                        }
                    }
                    previous_in_group = Some(task.name.as_str());
                }
            }

            order.push(task.name.clone());
            nodes.insert(
                task.name.clone(),
                DagNode {
                    deps,
                    dependents: Vec::new(),
                },
            );
        }

        // Second pass: resolve deps and populate dependents. Iterating in
        // registration order keeps every dependents list in that order.
        for name in order.iter() {
            let deps = nodes.get(name).map(|n| n.deps.clone()).unwrap_or_default();
            for dep in deps {
                if &dep == name {
                    return Err(ParbuildError::DagCycle(format!(
                        "task '{name}' cannot depend on itself"
                    )));
                }
                match nodes.get_mut(&dep) {
                    Some(dep_node) => dep_node.dependents.push(name.clone()),
                    None => {
                        return Err(ParbuildError::UnknownTask {
                            task: name.clone(),
                            dependency: dep,
                        });
                    }
                }
            }
        }

        let graph = Self { order, nodes };
        ensure_acyclic(graph.tasks(), graph.edges())?;
        Ok(graph)
    }

    /// All task names in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// `(dependency, dependent)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order.iter().flat_map(move |name| {
            self.dependencies_of(name)
                .iter()
                .map(move |dep| (dep.as_str(), name.as_str()))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Immediate dependencies of a task, including serialisation edges.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task, in registration order.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Tasks with no dependencies, in registration order.
    pub fn roots(&self) -> Vec<TaskName> {
        self.order
            .iter()
            .filter(|name| self.dependencies_of(name).is_empty())
            .cloned()
            .collect()
    }

    /// Group tasks into submission waves assuming every task succeeds.
    ///
    /// A task lands in the wave after its deepest dependency.
    pub fn waves(&self) -> Vec<Vec<TaskName>> {
        let mut depth: HashMap<&str, usize> = HashMap::new();
        let mut waves: Vec<Vec<TaskName>> = Vec::new();

        // Registration order is not necessarily topological, so settle depths
        // in rounds until every task has one.
        while depth.len() < self.order.len() {
            for name in self.order.iter() {
                if depth.contains_key(name.as_str()) {
                    continue;
                }
                let deps = self.dependencies_of(name);
                if deps.iter().all(|d| depth.contains_key(d.as_str())) {
                    let d = deps
                        .iter()
                        .map(|d| depth[d.as_str()] + 1)
                        .max()
                        .unwrap_or(0);
                    depth.insert(name.as_str(), d);
                }
            }
        }

        for name in self.order.iter() {
            let d = depth[name.as_str()];
            if waves.len() <= d {
                waves.resize_with(d + 1, Vec::new);
            }
            waves[d].push(name.clone());
        }
        waves
    }
}

/// Fail with [`ParbuildError::DagCycle`] if the edges contain a cycle.
///
/// Edge direction: dependency -> dependent.
pub fn ensure_acyclic<'a>(
    nodes: impl IntoIterator<Item = &'a str>,
    edges: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<()> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for node in nodes {
        graph.add_node(node);
    }
    for (dep, task) in edges {
        graph.add_edge(dep, task, ());
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(ParbuildError::DagCycle(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}
