use std::sync::{Arc, Mutex};
use std::time::Duration;

use parbuild::task::{BodyError, BodyFuture, Task, TaskBody};

#[derive(Debug, Default)]
struct ProbeState {
    started: Vec<String>,
    finished: Vec<String>,
    active: usize,
    max_active: usize,
}

/// Shared recorder for scripted task bodies.
///
/// Every body created from the same probe reports when it starts and
/// finishes, so tests can check invocation counts, ordering and the peak
/// number of bodies running at once.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    state: Arc<Mutex<ProbeState>>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Task that sleeps for `delay` and then reports `outcome`.
    pub fn task(&self, name: &str, delay: Duration, outcome: Result<(), BodyError>) -> Task {
        Task::new(
            name,
            Arc::new(ScriptedBody {
                name: name.to_string(),
                delay,
                outcome,
                panics: false,
                probe: self.clone(),
            }),
        )
    }

    /// Task that succeeds after `millis`.
    pub fn ok(&self, name: &str, millis: u64) -> Task {
        self.task(name, Duration::from_millis(millis), Ok(()))
    }

    /// Task that fails with exit status 1 after `millis`.
    pub fn failing(&self, name: &str, millis: u64) -> Task {
        self.task(name, Duration::from_millis(millis), Err(BodyError::Exit(1)))
    }

    /// Task that panics after `millis`.
    pub fn panicking(&self, name: &str, millis: u64) -> Task {
        Task::new(
            name,
            Arc::new(ScriptedBody {
                name: name.to_string(),
                delay: Duration::from_millis(millis),
                outcome: Ok(()),
                panics: true,
                probe: self.clone(),
            }),
        )
    }

    /// Task names in the order their bodies started.
    pub fn started(&self) -> Vec<String> {
        self.state.lock().unwrap().started.clone()
    }

    /// Task names in the order their bodies finished.
    pub fn finished(&self) -> Vec<String> {
        self.state.lock().unwrap().finished.clone()
    }

    pub fn invocations(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .started
            .iter()
            .filter(|n| *n == name)
            .count()
    }

    pub fn was_started(&self, name: &str) -> bool {
        self.invocations(name) > 0
    }

    /// Peak number of bodies running at the same time.
    pub fn max_concurrency(&self) -> usize {
        self.state.lock().unwrap().max_active
    }

    fn begin(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.started.push(name.to_string());
        state.active += 1;
        state.max_active = state.max_active.max(state.active);
    }

    fn end(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.finished.push(name.to_string());
        state.active -= 1;
    }
}

/// Task body with a fixed delay and outcome.
pub struct ScriptedBody {
    name: String,
    delay: Duration,
    outcome: Result<(), BodyError>,
    panics: bool,
    probe: Probe,
}

impl TaskBody for ScriptedBody {
    fn run(&self) -> BodyFuture<'_> {
        Box::pin(async move {
            self.probe.begin(&self.name);
            tokio::time::sleep(self.delay).await;
            self.probe.end(&self.name);

            if self.panics {
                panic!("scripted panic in {}", self.name);
            }
            self.outcome.clone()
        })
    }
}
