// src/dag/mod.rs

//! DAG representation and dependency resolution.
//!
//! - [`graph`] holds the validated task graph (including serialisation
//!   edges for the sequential fallback).
//! - [`resolver`] contains the per-run state machine that decides which
//!   tasks may be submitted as results arrive.

pub mod graph;
pub mod resolver;

pub use graph::DagGraph;
pub use resolver::{Resolver, TaskState};
