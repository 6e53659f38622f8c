// src/staging.rs

//! Build output staging.
//!
//! Tasks write into a fresh staging directory; only a fully successful run
//! replaces the real output directory. A failed run leaves the previous
//! output untouched and the staging directory is removed on drop.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{info, warn};

use crate::config::model::OutputSection;
use crate::errors::Result;

/// Placeholder in task commands that expands to the staging directory.
pub const TEMP_DIR_PLACEHOLDER: &str = "{temp_dir}";

/// Environment variable carrying the staging directory to task processes.
pub const TEMP_DIR_ENV: &str = "PARBUILD_TEMP_DIR";

#[derive(Debug)]
pub struct Staging {
    dir: TempDir,
    dist: PathBuf,
    prefix: String,
}

impl Staging {
    /// Create a staging directory next to `output.dist` (resolved against
    /// `root`).
    pub fn create(root: &Path, output: &OutputSection) -> Result<Self> {
        let dist = root.join(&output.dist);
        let parent = output_parent(&dist);
        fs::create_dir_all(&parent)?;

        let dir = tempfile::Builder::new()
            .prefix(&output.staging_prefix)
            .tempdir_in(&parent)?;

        info!(staging = %dir.path().display(), dist = %dist.display(), "created staging directory");
        Ok(Self {
            dir,
            dist,
            prefix: output.staging_prefix.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Expand `{temp_dir}` in a command line.
    pub fn expand(&self, cmd: &str) -> String {
        cmd.replace(TEMP_DIR_PLACEHOLDER, &self.path().to_string_lossy())
    }

    /// Swap the staging directory into place as the new output.
    ///
    /// The previous output is moved aside first and deleted afterwards. If
    /// the final rename fails, the previous output is put back.
    pub fn publish(self) -> Result<PathBuf> {
        let parent = output_parent(&self.dist);
        let trash = tempfile::Builder::new()
            .prefix(&format!("{}-old", self.prefix))
            .tempdir_in(&parent)?;
        let old = trash.path().join("dist");

        let had_previous = match fs::rename(&self.dist, &old) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = fs::rename(self.dir.path(), &self.dist) {
            if had_previous {
                if let Err(restore) = fs::rename(&old, &self.dist) {
                    warn!(error = %restore, "failed to restore previous output");
                }
            }
            return Err(e.into());
        }

        // Dropping `self.dir` now is a no-op: its path no longer exists.
        if let Err(e) = trash.close() {
            warn!(error = %e, "failed to remove previous output");
        }

        info!(dist = %self.dist.display(), "published build output");
        Ok(self.dist)
    }
}

fn output_parent(dist: &Path) -> PathBuf {
    match dist.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
