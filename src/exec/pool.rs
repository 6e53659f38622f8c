// src/exec/pool.rs

//! Bounded worker pool.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::task::{Instrumented, Task, TaskName, TaskResult};

/// One unit of queued work plus the channel its result goes back on.
struct Job {
    task: Instrumented,
    done: oneshot::Sender<TaskResult>,
}

/// Fixed number of workers pulling from one FIFO queue.
///
/// At most `max_workers` task bodies run at the same time; everything else
/// waits in the queue. A body holds its worker until it finishes. Bodies are
/// never cancelled or retried.
pub struct WorkerPool {
    queue: mpsc::UnboundedSender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `max_workers` worker loops (at least one).
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..max_workers)
            .map(|id| tokio::spawn(worker_loop(id, Arc::clone(&rx))))
            .collect();

        info!(max_workers, "worker pool started");
        Self { queue: tx, workers }
    }

    pub fn max_workers(&self) -> usize {
        self.workers.len()
    }

    /// Enqueue a task and return immediately.
    ///
    /// The returned handle resolves to the task's result once a worker has
    /// run it.
    pub fn submit(&self, task: &Task) -> TaskHandle {
        let (done_tx, done_rx) = oneshot::channel();
        let job = Job {
            task: Instrumented::new(task),
            done: done_tx,
        };

        debug!(task = %task.name, "submitting task to pool");
        if self.queue.send(job).is_err() {
            // The job (and its sender) is dropped here, so the handle
            // resolves to a lost result instead of hanging.
            warn!(task = %task.name, "worker pool queue closed; task will not run");
        }

        TaskHandle {
            name: task.name.clone(),
            rx: done_rx,
        }
    }

    /// Close the queue and wait for every worker to drain it.
    pub async fn shutdown(self) {
        drop(self.queue);
        for handle in self.workers {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker terminated abnormally");
            }
        }
        debug!("worker pool shut down");
    }
}

async fn worker_loop(id: usize, queue: Arc<Mutex<mpsc::UnboundedReceiver<Job>>>) {
    loop {
        // Hold the lock only while waiting for the next job, not while
        // running it.
        let job = {
            let mut rx = queue.lock().await;
            rx.recv().await
        };

        let Some(job) = job else {
            break;
        };

        debug!(worker = id, task = %job.task.name(), "task started");
        let result = job.task.run().await;

        if job.done.send(result).is_err() {
            debug!(worker = id, "task handle dropped before completion was delivered");
        }
    }
    debug!(worker = id, "worker exiting (queue closed)");
}

/// Pending result of a submitted task.
///
/// Always resolves to exactly one [`TaskResult`]; if the pool drops the job
/// the result is a failure with [`crate::task::BodyError::Lost`].
#[derive(Debug)]
pub struct TaskHandle {
    name: TaskName,
    rx: oneshot::Receiver<TaskResult>,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Future for TaskHandle {
    type Output = TaskResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(TaskResult::lost(self.name.clone())),
            Poll::Pending => Poll::Pending,
        }
    }
}
