// src/engine/mod.rs

//! Orchestration engine for parbuild.
//!
//! This module ties together:
//! - the dependency resolver (which tasks may start)
//! - the worker pool (where they run)
//! - the completion collector (what happened, and the first failure)
//! - the reporter (timing summary for a successful run)

pub mod collector;
pub mod orchestrator;
pub mod report;

pub use collector::Collector;
pub use orchestrator::{Orchestrator, RunOptions, RunReport};
pub use report::{Reporter, format_line};
