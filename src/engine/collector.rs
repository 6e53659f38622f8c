// src/engine/collector.rs

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tracing::{debug, warn};

use crate::errors::{ParbuildError, Result};
use crate::exec::TaskHandle;
use crate::task::{BodyError, TaskName, TaskOutcome, TaskResult};

/// Per-run record of completed tasks.
///
/// Results are kept in arrival order. The first failure observed is the
/// run's designated cause; later failures are kept in `results` but never
/// replace it.
#[derive(Debug, Default)]
pub struct Collector {
    results: Vec<TaskResult>,
    first_failure: Option<(TaskName, BodyError)>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completion. Returns `true` if it became the run's first
    /// failure.
    pub fn record(&mut self, result: TaskResult) -> bool {
        let mut is_first_failure = false;

        match result.outcome {
            TaskOutcome::Success => {
                debug!(
                    task = %result.name,
                    duration_ms = result.duration.as_millis() as u64,
                    "task succeeded"
                );
            }
            TaskOutcome::Failed(ref err) => {
                if self.first_failure.is_none() {
                    warn!(task = %result.name, "task failed");
                    debug!(task = %result.name, error = %err, "first failure");
                    self.first_failure = Some((result.name.clone(), err.clone()));
                    is_first_failure = true;
                } else {
                    debug!(task = %result.name, error = %err, "additional task failure");
                }
            }
        }

        self.results.push(result);
        is_first_failure
    }

    /// Wait for every handle, recording results in the order they complete.
    ///
    /// Outstanding handles are always awaited, even after a failure.
    pub async fn await_all(&mut self, handles: impl IntoIterator<Item = TaskHandle>) -> Result<()> {
        let mut pending: FuturesUnordered<TaskHandle> = handles.into_iter().collect();

        while let Some(result) = pending.next().await {
            self.record(result);
        }

        self.outcome()
    }

    /// `Err(TaskFailed)` for the first recorded failure, `Ok(())` otherwise.
    pub fn outcome(&self) -> Result<()> {
        match self.first_failure {
            Some((ref task, ref source)) => Err(ParbuildError::TaskFailed {
                task: task.clone(),
                source: source.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn first_failure(&self) -> Option<(&str, &BodyError)> {
        self.first_failure
            .as_ref()
            .map(|(name, err)| (name.as_str(), err))
    }

    /// Number of failed results recorded, including the first.
    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }

    /// Results in arrival order.
    pub fn results(&self) -> &[TaskResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<TaskResult> {
        self.results
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn failed(name: &str, code: i32) -> TaskResult {
        TaskResult {
            name: name.to_string(),
            duration: Duration::from_millis(10),
            outcome: TaskOutcome::Failed(BodyError::Exit(code)),
        }
    }

    #[test]
    fn first_failure_is_logged_once_by_name_only_at_warn() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mut collector = Collector::new();
        tracing::subscriber::with_default(subscriber, || {
            assert!(collector.record(failed("lint", 1)));
            assert!(!collector.record(failed("test", 2)));
        });

        let logged = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(logged.lines().count(), 1, "{logged}");
        assert!(logged.contains("task failed"));
        assert!(logged.contains("lint"));
        assert!(!logged.contains("exited with status"));
        assert_eq!(collector.failure_count(), 2);
    }
}
