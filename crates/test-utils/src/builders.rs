#![allow(dead_code)]

use std::collections::BTreeMap;

use parbuild::config::{
    ConfigFile, ConfigSection, OutputSection, ProfileConfig, RawConfigFile, TaskConfig,
};
use parbuild::errors::Result;

/// Builder for `RawConfigFile` / `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                output: None,
                profile: BTreeMap::new(),
                task: Vec::new(),
            },
        }
    }

    pub fn with_task(mut self, task: TaskConfig) -> Self {
        self.config.task.push(task);
        self
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.config.config.max_workers = n;
        self
    }

    pub fn fail_fast(mut self, val: bool) -> Self {
        self.config.config.fail_fast = val;
        self
    }

    pub fn sequential_group(mut self, group: &str) -> Self {
        self.config.config.sequential_group = Some(group.to_string());
        self
    }

    pub fn with_output(mut self, output: OutputSection) -> Self {
        self.config.output = Some(output);
        self
    }

    pub fn with_profile(
        mut self,
        name: &str,
        max_workers: Option<usize>,
        tasks: Option<Vec<&str>>,
    ) -> Self {
        self.config.profile.insert(
            name.to_string(),
            ProfileConfig {
                max_workers,
                tasks: tasks.map(|t| t.iter().map(|s| s.to_string()).collect()),
            },
        );
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build().expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(name: &str, cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                name: name.to_string(),
                cmd: cmd.to_string(),
                after: vec![],
                group: None,
                files: BTreeMap::new(),
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.task.group = Some(group.to_string());
        self
    }

    pub fn file(mut self, path: &str, contents: &str) -> Self {
        self.task.files.insert(path.to_string(), contents.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
