// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Raw configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// max_workers = 20
/// sequential_group = "api"
///
/// [output]
/// dist = "dist"
///
/// [[task]]
/// name = "esm-types"
/// cmd = "tsc --outDir {temp_dir}/esm-types"
///
/// [[task]]
/// name = "api-esm"
/// cmd = "api-extractor run"
/// after = ["esm-types"]
/// group = "api"
/// ```
///
/// Tasks are an array of tables so that declaration order survives
/// deserialization; that order is the registration order.
///
/// This struct is not validated. Use [`ConfigFile`] for a validated
/// configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Optional staging/swap of the build output from `[output]`.
    #[serde(default)]
    pub output: Option<OutputSection>,

    /// Named profiles from `[profile.<name>]`.
    #[serde(default)]
    pub profile: BTreeMap<String, ProfileConfig>,

    /// All tasks from `[[task]]`, in declaration order.
    #[serde(default)]
    pub task: Vec<TaskConfig>,
}

/// Validated configuration.
///
/// Guarantees at least one task, a usable worker count, known prerequisites,
/// no self-dependencies, an acyclic graph and consistent profiles.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub output: Option<OutputSection>,
    pub profile: BTreeMap<String, ProfileConfig>,
    pub task: Vec<TaskConfig>,
}

impl ConfigFile {
    /// Internal constructor used by validation.
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            output: raw.output,
            profile: raw.profile,
            task: raw.task,
        }
    }

    /// Look up a task by name.
    pub fn task(&self, name: &str) -> Option<&TaskConfig> {
        self.task.iter().find(|t| t.name == name)
    }

    /// Narrow this config to a named profile.
    ///
    /// The profile's `max_workers` replaces `[config].max_workers` and, if the
    /// profile lists `tasks`, only those tasks are kept (in their original
    /// declaration order). Validation already guaranteed the subset is closed
    /// under `after`.
    pub fn with_profile(&self, name: &str) -> Option<ConfigFile> {
        let profile = self.profile.get(name)?;

        let mut narrowed = self.clone();
        if let Some(max_workers) = profile.max_workers {
            narrowed.config.max_workers = max_workers;
        }
        if let Some(ref tasks) = profile.tasks {
            narrowed.task.retain(|t| tasks.contains(&t.name));
        }
        Some(narrowed)
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Number of worker slots in the pool.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Stop submitting new tasks once any task has failed.
    #[serde(default = "default_fail_fast")]
    pub fail_fast: bool,

    /// Group that runs one task at a time when the sequential fallback is
    /// switched on (`--sequential` / `PARBUILD_SEQUENTIAL`).
    #[serde(default)]
    pub sequential_group: Option<String>,
}

fn default_max_workers() -> usize {
    8
}

fn default_fail_fast() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            fail_fast: default_fail_fast(),
            sequential_group: None,
        }
    }
}

/// `[output]` section.
///
/// When present, tasks build into a fresh staging directory which replaces
/// `dist` only if every task succeeded.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_dist")]
    pub dist: PathBuf,

    #[serde(default = "default_staging_prefix")]
    pub staging_prefix: String,
}

fn default_dist() -> PathBuf {
    PathBuf::from("dist")
}

fn default_staging_prefix() -> String {
    "tmpDist".to_string()
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dist: default_dist(),
            staging_prefix: default_staging_prefix(),
        }
    }
}

/// `[profile.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub max_workers: Option<usize>,

    /// Subset of task names to build. `None` keeps every task.
    #[serde(default)]
    pub tasks: Option<Vec<String>>,
}

/// `[[task]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Unique task name.
    pub name: String,

    /// Shell command to execute. `{temp_dir}` expands to the staging
    /// directory when `[output]` is configured.
    pub cmd: String,

    /// Prerequisites: this task waits until all of these succeeded.
    #[serde(default)]
    pub after: Vec<String>,

    /// Optional group name (used by the sequential fallback).
    #[serde(default)]
    pub group: Option<String>,

    /// Files written into the staging directory before `cmd` runs.
    ///
    /// Keys are paths relative to the staging directory.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

impl TaskConfig {
    /// Whether this task needs a staging directory to run.
    pub fn uses_staging(&self) -> bool {
        self.cmd.contains(crate::staging::TEMP_DIR_PLACEHOLDER) || !self.files.is_empty()
    }
}
