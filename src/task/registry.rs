// src/task/registry.rs

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::model::ConfigFile;
use crate::dag::DagGraph;
use crate::errors::{ParbuildError, Result};
use crate::exec::CommandBody;
use crate::staging::Staging;
use crate::task::{Task, TaskName};

/// Ordered set of uniquely named tasks.
///
/// Registration order is preserved; it breaks ties in the timing report and
/// fixes the order of a serialised group.
#[derive(Debug, Default, Clone)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
    index: HashMap<TaskName, usize>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry of command tasks from a validated config.
    ///
    /// Commands run from `root`. When a staging directory is given, the
    /// `{temp_dir}` placeholder is expanded and `files` are resolved inside it.
    pub fn from_config(cfg: &ConfigFile, root: &Path, staging: Option<&Staging>) -> Result<Self> {
        let mut registry = Self::new();

        for tc in cfg.task.iter() {
            let body = CommandBody::from_config(tc, root, staging);
            let mut task = Task::new(tc.name.clone(), Arc::new(body));
            task.prerequisites = tc.after.clone();
            task.group = tc.group.clone();
            registry.register(task)?;
        }

        Ok(registry)
    }

    /// Add a task. Fails with [`ParbuildError::DuplicateTask`] if a task with
    /// the same name is already registered.
    pub fn register(&mut self, task: Task) -> Result<()> {
        if self.index.contains_key(&task.name) {
            return Err(ParbuildError::DuplicateTask(task.name));
        }

        debug!(task = %task.name, prerequisites = ?task.prerequisites, "registered task");
        self.index.insert(task.name.clone(), self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    /// All tasks in registration order.
    pub fn all_tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    /// Registration position of a task.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Check that prerequisites exist, no task waits on itself, and the
    /// graph is acyclic.
    pub fn validate(&self) -> Result<()> {
        DagGraph::from_registry(self, None).map(|_| ())
    }
}
