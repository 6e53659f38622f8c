// src/task/mod.rs

//! Task model.
//!
//! - [`body`] defines the opaque unit of work a task wraps.
//! - [`instrumented`] measures a body and turns it into a [`TaskResult`].
//! - [`registry`] holds the ordered, uniquely named set of tasks for a run.

pub mod body;
pub mod instrumented;
pub mod registry;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use body::{BodyError, BodyFuture, FnBody, TaskBody, from_fn};
pub use instrumented::Instrumented;
pub use registry::TaskRegistry;

/// Public type alias for task names throughout the crate.
pub type TaskName = String;

/// A named unit of work plus the tasks it waits for.
#[derive(Clone)]
pub struct Task {
    pub name: TaskName,
    pub body: Arc<dyn TaskBody>,
    /// Tasks that must succeed before this one is submitted.
    pub prerequisites: Vec<TaskName>,
    /// Optional group, used by the sequential fallback.
    pub group: Option<String>,
}

impl Task {
    pub fn new(name: impl Into<TaskName>, body: Arc<dyn TaskBody>) -> Self {
        Self {
            name: name.into(),
            body,
            prerequisites: Vec::new(),
            group: None,
        }
    }

    /// Add a prerequisite.
    pub fn after(mut self, dep: impl Into<TaskName>) -> Self {
        self.prerequisites.push(dep.into());
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("prerequisites", &self.prerequisites)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

/// How a task body ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(BodyError),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// Timing and outcome of one task invocation. Produced exactly once per
/// submitted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub name: TaskName,
    pub duration: Duration,
    pub outcome: TaskOutcome,
}

impl TaskResult {
    /// Result for a task whose completion never made it back from the pool.
    pub fn lost(name: TaskName) -> Self {
        Self {
            name,
            duration: Duration::ZERO,
            outcome: TaskOutcome::Failed(BodyError::Lost),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}
