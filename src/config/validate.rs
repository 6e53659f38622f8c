// src/config/validate.rs

use std::collections::HashSet;
use std::path::{Component, Path};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::graph::ensure_acyclic;
use crate::errors::{ParbuildError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ParbuildError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_staging_usage(cfg)?;
    validate_profiles(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(ParbuildError::ConfigError(
            "config must contain at least one [[task]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.max_workers == 0 {
        return Err(ParbuildError::ConfigError(
            "[config].max_workers must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

// Duplicate names are left to the registry, which reports them as
// `DuplicateTask` when the tasks are registered.
fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    let names: HashSet<&str> = cfg.task.iter().map(|t| t.name.as_str()).collect();

    for task in cfg.task.iter() {
        for dep in task.after.iter() {
            if dep == &task.name {
                return Err(ParbuildError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    task.name
                )));
            }
            if !names.contains(dep.as_str()) {
                return Err(ParbuildError::UnknownTask {
                    task: task.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_staging_usage(cfg: &RawConfigFile) -> Result<()> {
    for task in cfg.task.iter() {
        for rel in task.files.keys() {
            let path = Path::new(rel);
            let escapes = path
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
            if escapes {
                return Err(ParbuildError::ConfigError(format!(
                    "task '{}' file '{}' must be a relative path inside the staging directory",
                    task.name, rel
                )));
            }
        }
    }

    if cfg.output.is_some() {
        return Ok(());
    }

    match cfg.task.iter().find(|t| t.uses_staging()) {
        Some(task) => Err(ParbuildError::ConfigError(format!(
            "task '{}' uses {{temp_dir}} or `files` but no [output] section is configured",
            task.name
        ))),
        None => Ok(()),
    }
}

fn validate_profiles(cfg: &RawConfigFile) -> Result<()> {
    for (name, profile) in cfg.profile.iter() {
        if profile.max_workers == Some(0) {
            return Err(ParbuildError::ConfigError(format!(
                "[profile.{name}].max_workers must be >= 1 (got 0)"
            )));
        }

        let Some(ref tasks) = profile.tasks else {
            continue;
        };

        for task_name in tasks {
            let Some(task) = cfg.task.iter().find(|t| &t.name == task_name) else {
                return Err(ParbuildError::ConfigError(format!(
                    "[profile.{name}] lists unknown task '{task_name}'"
                )));
            };

            // The subset must carry its own prerequisites, otherwise the
            // gated tasks could never be submitted.
            if let Some(dep) = task.after.iter().find(|dep| !tasks.contains(dep)) {
                return Err(ParbuildError::ConfigError(format!(
                    "[profile.{name}] includes '{task_name}' but not its prerequisite '{dep}'"
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    let nodes = cfg.task.iter().map(|t| t.name.as_str());
    let edges = cfg.task.iter().flat_map(|task| {
        task.after
            .iter()
            .map(move |dep| (dep.as_str(), task.name.as_str()))
    });
    ensure_acyclic(nodes, edges)
}
