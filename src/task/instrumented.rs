// src/task/instrumented.rs

//! Duration measurement around any [`TaskBody`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::task::{BodyError, Task, TaskBody, TaskName, TaskOutcome, TaskResult};

/// A task body paired with its name, ready to be timed.
///
/// Running it never fails: body errors and panics both become a
/// [`TaskOutcome::Failed`] inside the returned [`TaskResult`].
pub struct Instrumented {
    name: TaskName,
    body: Arc<dyn TaskBody>,
}

impl Instrumented {
    pub fn new(task: &Task) -> Self {
        Self {
            name: task.name.clone(),
            body: Arc::clone(&task.body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn run(self) -> TaskResult {
        let started = Instant::now();
        // Call `run` inside the future so a panic before the first await is
        // caught as well.
        let res = AssertUnwindSafe(async { self.body.run().await })
            .catch_unwind()
            .await;
        let duration = started.elapsed();

        let outcome = match res {
            Ok(Ok(())) => TaskOutcome::Success,
            Ok(Err(err)) => TaskOutcome::Failed(err),
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                warn!(task = %self.name, panic = %msg, "task body panicked");
                TaskOutcome::Failed(BodyError::Panicked(msg))
            }
        };

        debug!(
            task = %self.name,
            duration_ms = duration.as_millis() as u64,
            success = outcome.is_success(),
            "task body finished"
        );

        TaskResult {
            name: self.name,
            duration,
            outcome,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
