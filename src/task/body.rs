// src/task/body.rs

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Why a task body reported failure.
///
/// The orchestrator only cares *that* a body failed; the variants exist so
/// the first failure can be named in logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BodyError {
    #[error("exited with status {0}")]
    Exit(i32),

    #[error("terminated by a signal")]
    Signal,

    #[error("could not start: {0}")]
    Spawn(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error("result was lost before reaching the collector")]
    Lost,
}

/// Boxed future returned by [`TaskBody::run`].
pub type BodyFuture<'a> = Pin<Box<dyn Future<Output = Result<(), BodyError>> + Send + 'a>>;

/// An opaque, no-input/no-output unit of work that may fail.
///
/// Production code wraps external commands (see
/// [`crate::exec::CommandBody`]); tests provide scripted bodies.
pub trait TaskBody: Send + Sync {
    fn run(&self) -> BodyFuture<'_>;
}

/// A task body backed by an async closure.
pub struct FnBody<F> {
    f: F,
}

impl<F, Fut> TaskBody for FnBody<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BodyError>> + Send + 'static,
{
    fn run(&self) -> BodyFuture<'_> {
        Box::pin((self.f)())
    }
}

/// Wrap a closure returning a future as a [`TaskBody`].
pub fn from_fn<F, Fut>(f: F) -> FnBody<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BodyError>> + Send + 'static,
{
    FnBody { f }
}
