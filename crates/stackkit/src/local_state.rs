//! Per-stage isolation of local state files.
//!
//! Terraform keeps a single `terraform.tfstate` per working directory. When a
//! stack runs without a remote backend, the live file is swapped with a
//! stage-scoped backup around each stage so stages never see each other's
//! state:
//!
//! - load (before `init`): remove live, remove live `.backup`, restore stage backup
//! - save (after the main command): copy live to stage backup, remove live, remove live `.backup`
//!
//! The step order matters after a crash: a save that dies after the copy
//! leaves both files, never neither.

use crate::error::{Error, Result};
use crate::resolve::resolve_path;
use crate::model::Config;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Live state file inside a stack folder.
pub const STATE_FILE: &str = "terraform.tfstate";

/// Provider lock file inside a stack folder.
pub const LOCK_FILE: &str = ".terraform.lock.hcl";

/// Cached backend state inside a stack folder's `.terraform` directory.
pub const CACHED_STATE_DIR: &str = ".terraform";

/// Name of the stage-scoped backup for a (stack, stage) pair.
pub fn backup_file_name(stack_name: &str, stage_name: &str) -> String {
    format!("terraform.{stack_name}.{stage_name}.tfstate")
}

/// Resolved file locations for one (stack, stage) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStateFiles {
    /// Directory holding stage backups
    pub backup_dir: PathBuf,
    /// `<stack folder>/terraform.tfstate`
    pub live: PathBuf,
    /// `<backup_dir>/terraform.<stack>.<stage>.tfstate`
    pub backup: PathBuf,
}

impl LocalStateFiles {
    /// Compute paths for a pair. `local_path` is the stack's `local.path`
    /// setting; without one, backups live next to the stack's files.
    pub fn new(
        config: &Config,
        stack_folder: &Path,
        local_path: Option<&str>,
        stack_name: &str,
        stage_name: &str,
    ) -> Self {
        let backup_dir = local_path
            .map(|path| resolve_path(&config.base_dir, path))
            .unwrap_or_else(|| stack_folder.to_path_buf());

        Self {
            backup: backup_dir.join(backup_file_name(stack_name, stage_name)),
            live: stack_folder.join(STATE_FILE),
            backup_dir,
        }
    }

    /// `terraform.tfstate.backup`, written by Terraform next to the live file.
    pub fn live_backup(&self) -> PathBuf {
        let mut name = self.live.as_os_str().to_owned();
        name.push(".backup");
        PathBuf::from(name)
    }

    /// Create the backup directory if it is missing.
    pub fn ensure_backup_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.backup_dir).map_err(|e| {
            Error::io(
                format!("Failed to create state directory {}", self.backup_dir.display()),
                e,
            )
        })
    }

    /// Swap the stage's backup in as the live state file.
    pub fn load(&self) -> Result<()> {
        self.ensure_backup_dir()?;

        if self.live.exists() {
            remove_file(&self.live)?;
            remove_if_exists(&self.live_backup())?;
        }

        if self.backup.exists() {
            fs::copy(&self.backup, &self.live).map_err(|e| {
                Error::io(
                    format!(
                        "Failed to restore {} from {}",
                        self.live.display(),
                        self.backup.display()
                    ),
                    e,
                )
            })?;
            log::info!("Restored local state from {}", self.backup.display());
        } else {
            log::debug!("No local state backup at {}", self.backup.display());
        }

        Ok(())
    }

    /// Move the live state file out to the stage's backup.
    pub fn save(&self) -> Result<()> {
        if !self.live.exists() {
            log::debug!("No live state at {}, nothing to save", self.live.display());
            return Ok(());
        }

        self.ensure_backup_dir()?;

        fs::copy(&self.live, &self.backup).map_err(|e| {
            Error::io(
                format!(
                    "Failed to back up {} to {}",
                    self.live.display(),
                    self.backup.display()
                ),
                e,
            )
        })?;
        log::info!("Saved local state to {}", self.backup.display());

        remove_file(&self.live)?;
        remove_if_exists(&self.live_backup())
    }
}

/// Remove the provider lock file from a stack folder. Absence is not an error.
pub fn delete_lock_file(stack_folder: &Path) {
    let lock = stack_folder.join(LOCK_FILE);
    match fs::remove_file(&lock) {
        Ok(()) => log::info!("\"{}\" removed...", lock.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("No lock file at {}", lock.display());
        }
        Err(e) => log::warn!("Could not remove {}: {e}", lock.display()),
    }
}

/// Remove a stale cached backend state file (`.terraform/terraform.tfstate`).
pub fn clear_cached_state(path: &Path) -> Result<()> {
    remove_if_exists(path)
}

/// Path of the cached backend state inside a stack folder.
pub fn cached_state_path(stack_folder: &Path) -> PathBuf {
    stack_folder.join(CACHED_STATE_DIR).join(STATE_FILE)
}

fn remove_file(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| Error::io(format!("Failed to remove {}", path.display()), e))
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(format!("Failed to remove {}", path.display()), e)),
    }
}
