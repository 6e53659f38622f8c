// src/exec/command.rs

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::config::model::TaskConfig;
use crate::staging::{Staging, TEMP_DIR_ENV};
use crate::task::{BodyError, BodyFuture, TaskBody};

/// Task body that runs a shell command.
///
/// Output is captured. On failure the command line and everything it printed
/// go to stderr, so the failing tool's own diagnostics are visible even
/// though the orchestrator itself stays terse.
#[derive(Debug, Clone)]
pub struct CommandBody {
    pub cmd: String,
    /// Working directory for the process.
    pub cwd: PathBuf,
    /// Staging directory, exported to the process as `PARBUILD_TEMP_DIR`.
    pub temp_dir: Option<PathBuf>,
    /// Files to write (absolute path, contents) before the command starts.
    pub files: Vec<(PathBuf, String)>,
}

impl CommandBody {
    pub fn new(cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            cmd: cmd.into(),
            cwd: cwd.into(),
            temp_dir: None,
            files: Vec::new(),
        }
    }

    /// Build the body for a configured task, expanding `{temp_dir}` and
    /// resolving `files` against the staging directory.
    pub fn from_config(tc: &TaskConfig, root: &Path, staging: Option<&Staging>) -> Self {
        match staging {
            Some(staging) => Self {
                cmd: staging.expand(&tc.cmd),
                cwd: root.to_path_buf(),
                temp_dir: Some(staging.path().to_path_buf()),
                files: tc
                    .files
                    .iter()
                    .map(|(rel, contents)| (staging.path().join(rel), contents.clone()))
                    .collect(),
            },
            None => Self::new(tc.cmd.clone(), root),
        }
    }

    async fn execute(&self) -> Result<(), BodyError> {
        self.write_files().await?;

        info!(cmd = %self.cmd, "starting task process");

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        };

        cmd.current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.temp_dir {
            cmd.env(TEMP_DIR_ENV, dir);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| BodyError::Spawn(format!("{}: {e}", self.cmd)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines() {
            debug!(cmd = %self.cmd, "stdout: {}", line);
        }
        for line in stderr.lines() {
            debug!(cmd = %self.cmd, "stderr: {}", line);
        }

        if output.status.success() {
            return Ok(());
        }

        eprintln!("error while running {}", self.cmd);
        eprintln!("{}", output.status);
        eprint!("{stdout}");
        eprint!("{stderr}");

        match output.status.code() {
            Some(code) => Err(BodyError::Exit(code)),
            None => Err(BodyError::Signal),
        }
    }

    async fn write_files(&self) -> Result<(), BodyError> {
        for (path, contents) in self.files.iter() {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| BodyError::Io(format!("creating {}: {e}", parent.display())))?;
            }
            tokio::fs::write(path, contents)
                .await
                .map_err(|e| BodyError::Io(format!("writing {}: {e}", path.display())))?;
        }
        Ok(())
    }
}

impl TaskBody for CommandBody {
    fn run(&self) -> BodyFuture<'_> {
        Box::pin(self.execute())
    }
}
