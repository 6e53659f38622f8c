// src/engine/orchestrator.rs

use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::model::ConfigSection;
use crate::dag::{DagGraph, Resolver};
use crate::engine::collector::Collector;
use crate::errors::{ParbuildError, Result};
use crate::exec::{TaskHandle, WorkerPool};
use crate::task::{BodyError, TaskName, TaskRegistry, TaskResult};

/// Options that influence a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Size of the worker pool.
    pub max_workers: usize,
    /// Stop submitting anything new after the first failure.
    pub fail_fast: bool,
    /// Group to run one task at a time, in registration order.
    pub sequential_group: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_workers: 8,
            fail_fast: true,
            sequential_group: None,
        }
    }
}

impl RunOptions {
    /// Derive options from `[config]`.
    ///
    /// The configured `sequential_group` only takes effect when the
    /// sequential fallback is switched on.
    pub fn from_config(section: &ConfigSection, sequential: bool) -> Self {
        let sequential_group = if sequential {
            if section.sequential_group.is_none() {
                warn!("sequential fallback requested but no [config].sequential_group is set");
            }
            section.sequential_group.clone()
        } else {
            None
        };

        Self {
            max_workers: section.max_workers,
            fail_fast: section.fail_fast,
            sequential_group,
        }
    }
}

/// Everything observed during one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One result per submitted task, in registration order.
    pub results: Vec<TaskResult>,
    /// Tasks that were never submitted, in registration order.
    pub skipped: Vec<TaskName>,
    /// Wall time from just before the first submission to just after the
    /// last completion.
    pub elapsed: Duration,
    /// First failure observed, if any.
    pub failure: Option<(TaskName, BodyError)>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn result_of(&self, task: &str) -> Option<&TaskResult> {
        self.results.iter().find(|r| r.name == task)
    }

    /// `Err(TaskFailed)` naming the first failure, or the report itself.
    pub fn into_result(self) -> Result<RunReport> {
        match self.failure {
            Some((task, source)) => Err(ParbuildError::TaskFailed { task, source }),
            None => Ok(self),
        }
    }
}

/// Runs a registry of tasks to completion.
///
/// Owns all per-run state; nothing survives between calls to [`run`], so an
/// orchestrator can be run repeatedly from library code.
///
/// [`run`]: Orchestrator::run
pub struct Orchestrator {
    registry: TaskRegistry,
    options: RunOptions,
}

impl Orchestrator {
    pub fn new(registry: TaskRegistry, options: RunOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// The validated graph this orchestrator will schedule.
    pub fn graph(&self) -> Result<DagGraph> {
        DagGraph::from_registry(&self.registry, self.options.sequential_group.as_deref())
    }

    /// Run every task, honouring prerequisites and the worker limit.
    ///
    /// Returns `Err` only if the task graph is invalid. Task failures are
    /// reported through [`RunReport::failure`]; every task that was
    /// submitted has finished by the time this returns.
    pub async fn run(&self) -> Result<RunReport> {
        let mut resolver = Resolver::new(self.graph()?, self.options.fail_fast);
        let pool = WorkerPool::new(self.options.max_workers);
        let mut collector = Collector::new();
        let mut in_flight: FuturesUnordered<TaskHandle> = FuturesUnordered::new();

        info!(
            tasks = self.registry.len(),
            max_workers = pool.max_workers(),
            fail_fast = self.options.fail_fast,
            sequential_group = ?self.options.sequential_group,
            "starting run"
        );

        let started = Instant::now();

        for name in resolver.initial_wave() {
            in_flight.push(self.submit(&pool, &name));
        }

        while let Some(result) = in_flight.next().await {
            let name = result.name.clone();
            let success = result.is_success();

            if collector.record(result) && self.options.fail_fast {
                info!(task = %name, "fail-fast: no further tasks will be started");
            }

            for ready in resolver.on_result(&name, success) {
                in_flight.push(self.submit(&pool, &ready));
            }
        }

        let elapsed = started.elapsed();
        pool.shutdown().await;

        debug_assert!(resolver.is_settled(), "run ended with unresolved tasks");

        let failure = collector
            .first_failure()
            .map(|(name, err)| (name.to_string(), err.clone()));
        let mut results = collector.into_results();
        results.sort_by_key(|r| self.registry.position(&r.name).unwrap_or(usize::MAX));

        let report = RunReport {
            results,
            skipped: resolver.skipped(),
            elapsed,
            failure,
        };

        info!(
            success = report.is_success(),
            completed = report.results.len(),
            skipped = report.skipped.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "run finished"
        );
        Ok(report)
    }

    fn submit(&self, pool: &WorkerPool, name: &str) -> TaskHandle {
        debug!(task = %name, "task ready");
        match self.registry.get(name) {
            Some(task) => pool.submit(task),
            // The graph was built from this registry, so every name resolves.
            None => unreachable!("resolver produced unregistered task '{name}'"),
        }
    }
}
