// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod staging;
pub mod task;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{Orchestrator, Reporter, RunOptions};
use crate::errors::ParbuildError;
use crate::staging::Staging;
use crate::task::TaskRegistry;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and profile selection
/// - output staging
/// - task registry / orchestrator
/// - the timing report
///
/// Returns `Ok(true)` if every task succeeded, `Ok(false)` if any task
/// failed (nothing is printed in that case), and `Err` for configuration or
/// I/O problems.
pub async fn run(args: CliArgs) -> Result<bool> {
    let config_path = PathBuf::from(&args.config);
    let cfg = select_profile(load_and_validate(&config_path)?, args.profile.as_deref())?;
    let root = config_root_dir(&config_path);

    let mut options = RunOptions::from_config(&cfg.config, args.sequential);
    if let Some(n) = args.max_workers {
        if n == 0 {
            return Err(ParbuildError::ConfigError("--max-workers must be >= 1".to_string()).into());
        }
        options.max_workers = n;
    }

    if args.dry_run {
        let registry = TaskRegistry::from_config(&cfg, &root, None)?;
        print_dry_run(&cfg, &Orchestrator::new(registry, options))?;
        return Ok(true);
    }

    let staging = cfg
        .output
        .as_ref()
        .map(|output| Staging::create(&root, output))
        .transpose()?;

    let registry = TaskRegistry::from_config(&cfg, &root, staging.as_ref())?;
    let report = Orchestrator::new(registry, options).run().await?;

    if !report.is_success() {
        // Dropping `staging` removes the partial output.
        if let Some((ref task, ref err)) = report.failure {
            debug!(task = %task, error = %err, "run failed");
        }
        return Ok(false);
    }

    if let Some(staging) = staging {
        let dist = staging.publish().context("publishing build output")?;
        info!(dist = %dist.display(), "output swapped into place");
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    Reporter::write(&report, &mut out)?;
    out.flush()?;

    Ok(true)
}

fn select_profile(cfg: ConfigFile, profile: Option<&str>) -> Result<ConfigFile> {
    match profile {
        None => Ok(cfg),
        Some(name) => {
            let narrowed = cfg.with_profile(name).ok_or_else(|| {
                ParbuildError::ConfigError(format!("unknown profile '{name}'"))
            })?;
            info!(profile = %name, tasks = narrowed.task.len(), "selected profile");
            Ok(narrowed)
        }
    }
}

/// Directory commands run from.
///
/// - If the config path has a non-empty parent (e.g. "web/Parbuild.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Parbuild.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Simple dry-run output: options, tasks, and the waves they would run in.
fn print_dry_run(cfg: &ConfigFile, orchestrator: &Orchestrator) -> Result<()> {
    let options = orchestrator.options();
    let graph = orchestrator.graph()?;

    println!("parbuild dry-run");
    println!("  config.max_workers = {}", options.max_workers);
    println!("  config.fail_fast = {}", options.fail_fast);
    if let Some(ref group) = options.sequential_group {
        println!("  sequential group = {group}");
    }
    if let Some(ref output) = cfg.output {
        println!("  output.dist = {}", output.dist.display());
    }
    println!();

    println!("tasks ({}):", cfg.task.len());
    for task in cfg.task.iter() {
        println!("  - {}", task.name);
        println!("      cmd: {}", task.cmd);
        let deps = graph.dependencies_of(&task.name);
        if !deps.is_empty() {
            println!("      after: {:?}", deps);
        }
        if let Some(ref group) = task.group {
            println!("      group: {group}");
        }
        if !task.files.is_empty() {
            println!("      files: {:?}", task.files.keys().collect::<Vec<_>>());
        }
    }
    println!();

    for (i, wave) in graph.waves().iter().enumerate() {
        println!("wave {}: {}", i + 1, wave.join(", "));
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
