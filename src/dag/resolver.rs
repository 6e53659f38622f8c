// src/dag/resolver.rs

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::task::TaskName;

/// Per-run state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Not yet submitted; waiting on prerequisites.
    Waiting,
    /// Handed to the worker pool (queued or running).
    Submitted,
    Succeeded,
    Failed,
    /// Never submitted: a prerequisite failed, or the run aborted.
    Skipped,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Skipped
        )
    }
}

/// Decides which tasks may be submitted, one observed result at a time.
///
/// The resolver is a pure state machine: it never touches the pool. The
/// orchestrator feeds it results and submits whatever it returns.
///
/// Rules:
/// - a task becomes ready once every dependency has `Succeeded`
/// - a failure skips all transitive dependents
/// - with `fail_fast`, a failure also skips every task still `Waiting`
#[derive(Debug, Clone)]
pub struct Resolver {
    graph: DagGraph,
    states: HashMap<TaskName, TaskState>,
    fail_fast: bool,
    aborted: bool,
}

impl Resolver {
    pub fn new(graph: DagGraph, fail_fast: bool) -> Self {
        let states = graph
            .tasks()
            .map(|name| (name.to_string(), TaskState::Waiting))
            .collect();

        Self {
            graph,
            states,
            fail_fast,
            aborted: false,
        }
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    /// Wave 1: every task without dependencies, in registration order.
    ///
    /// Returned tasks are marked `Submitted`.
    pub fn initial_wave(&mut self) -> Vec<TaskName> {
        let roots = self.graph.roots();
        for name in roots.iter() {
            self.states.insert(name.clone(), TaskState::Submitted);
        }
        info!(tasks = ?roots, "initial wave");
        roots
    }

    /// Record the result of a submitted task and return the tasks that are
    /// now ready to submit (already marked `Submitted`).
    pub fn on_result(&mut self, task: &str, success: bool) -> Vec<TaskName> {
        match self.states.get(task) {
            Some(TaskState::Submitted) => {}
            Some(state) => {
                warn!(task = %task, ?state, "result for task that was not submitted; ignoring");
                return Vec::new();
            }
            None => {
                warn!(task = %task, "result for unknown task; ignoring");
                return Vec::new();
            }
        }

        if !success {
            self.states.insert(task.to_string(), TaskState::Failed);
            self.skip_dependents(task);
            if self.fail_fast && !self.aborted {
                self.abort();
            }
            return Vec::new();
        }

        self.states.insert(task.to_string(), TaskState::Succeeded);
        if self.aborted {
            return Vec::new();
        }

        let mut ready = Vec::new();
        for dependent in self.graph.dependents_of(task) {
            if self.states.get(dependent) == Some(&TaskState::Waiting)
                && self.deps_satisfied(dependent)
            {
                debug!(task = %dependent, after = %task, "prerequisites satisfied");
                ready.push(dependent.clone());
            }
        }
        for name in ready.iter() {
            self.states.insert(name.clone(), TaskState::Submitted);
        }
        ready
    }

    /// Whether every dependency of `task` has succeeded.
    pub fn deps_satisfied(&self, task: &str) -> bool {
        self.graph
            .dependencies_of(task)
            .iter()
            .all(|dep| self.states.get(dep) == Some(&TaskState::Succeeded))
    }

    pub fn state_of(&self, task: &str) -> Option<TaskState> {
        self.states.get(task).copied()
    }

    /// Number of tasks handed to the pool whose result is still outstanding.
    pub fn in_flight(&self) -> usize {
        self.states
            .values()
            .filter(|s| **s == TaskState::Submitted)
            .count()
    }

    /// Tasks that will never be submitted, in registration order.
    pub fn skipped(&self) -> Vec<TaskName> {
        self.graph
            .tasks()
            .filter(|name| self.state_of(name) == Some(TaskState::Skipped))
            .map(|s| s.to_string())
            .collect()
    }

    /// True once every task reached a terminal state.
    pub fn is_settled(&self) -> bool {
        self.states.values().all(|s| s.is_terminal())
    }

    /// Stop submitting: everything still waiting is skipped.
    fn abort(&mut self) {
        self.aborted = true;
        let mut skipped = Vec::new();
        for (name, state) in self.states.iter_mut() {
            if *state == TaskState::Waiting {
                *state = TaskState::Skipped;
                skipped.push(name.clone());
            }
        }
        skipped.sort();
        if !skipped.is_empty() {
            info!(tasks = ?skipped, "run aborted; skipping tasks not yet submitted");
        }
    }

    /// Skip every waiting task that (transitively) depends on `failed`.
    fn skip_dependents(&mut self, failed: &str) {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed).to_vec();

        while let Some(name) = stack.pop() {
            if self.states.get(&name) == Some(&TaskState::Waiting) {
                debug!(task = %name, upstream = %failed, "skipping dependent of failed task");
                self.states.insert(name.clone(), TaskState::Skipped);
                stack.extend(self.graph.dependents_of(&name).iter().cloned());
            }
        }
    }
}
