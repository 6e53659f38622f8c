// src/exec/mod.rs

//! Execution layer.
//!
//! - [`pool`] owns the bounded worker pool that runs task bodies and hands
//!   back one [`TaskHandle`] per submission.
//! - [`command`] is the production task body: a shell command run with
//!   `tokio::process::Command`.

pub mod command;
pub mod pool;

pub use command::CommandBody;
pub use pool::{TaskHandle, WorkerPool};
