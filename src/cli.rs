// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::builder::FalseyValueParser;
use clap::{Parser, ValueEnum};

/// Command-line arguments for `parbuild`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "parbuild",
    version,
    about = "Run package-build commands in parallel, respecting their prerequisites.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Parbuild.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Parbuild.toml")]
    pub config: String,

    /// Named `[profile.<name>]` to build instead of the full task table.
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Override the worker pool size from the config.
    #[arg(long, value_name = "N")]
    pub max_workers: Option<usize>,

    /// Run the configured `sequential_group` one task at a time.
    ///
    /// Works around tools that misbehave when several instances run at once.
    /// Any `PARBUILD_SEQUENTIAL` value other than empty, `0`, `false`, `no`,
    /// `off`, `n` or `f` switches it on.
    #[arg(long, env = "PARBUILD_SEQUENTIAL", value_parser = FalseyValueParser::new())]
    pub sequential: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PARBUILD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print tasks and waves, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
