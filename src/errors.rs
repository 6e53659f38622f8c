// src/errors.rs

//! Crate-wide error type and aliases.

use thiserror::Error;

use crate::task::BodyError;

#[derive(Error, Debug)]
pub enum ParbuildError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Duplicate task name: {0}")]
    DuplicateTask(String),

    #[error("task '{task}' has unknown prerequisite '{dependency}'")]
    UnknownTask { task: String, dependency: String },

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: BodyError,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ParbuildError>;
