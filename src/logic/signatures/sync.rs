//! Signature Synchronisation
//!
//! Keeps the local signature database in step with its upstream git
//! repository. The first sync clones, every later one pulls.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use super::types::SyncError;

/// Refreshes the on-disk signature database
pub trait SignatureSync: Send + Sync {
    fn sync(&self) -> Result<(), SyncError>;
}

/// Git-backed sync: `git clone` into the data dir, then `git pull` on later runs
#[derive(Debug, Clone)]
pub struct GitSignatureSync {
    repo_url: String,
    target: PathBuf,
}

impl GitSignatureSync {
    pub fn new(repo_url: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            repo_url: repo_url.into(),
            target: target.into(),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    fn is_checkout(&self) -> bool {
        self.target.join(".git").exists()
    }

    fn git(&self, args: &[&str]) -> Result<Output, SyncError> {
        let output = Command::new("git").args(args).output()?;

        if !output.status.success() {
            return Err(SyncError::Git {
                command: args.first().copied().unwrap_or_default().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

impl SignatureSync for GitSignatureSync {
    fn sync(&self) -> Result<(), SyncError> {
        let target = self.target.to_string_lossy();

        if self.is_checkout() {
            log::info!("[Signatures] Pulling updates into {}", target);
            let output = self.git(&["-C", &target, "pull", "--ff-only"])?;
            let stdout = String::from_utf8_lossy(&output.stdout);
            if stdout.contains("Already up to date") {
                log::info!("[Signatures] Database already up to date");
            }
        } else {
            log::info!("[Signatures] Cloning {} into {}", self.repo_url, target);
            self.git(&["clone", "--depth", "1", &self.repo_url, &target])?;
        }

        if let Ok(head) = self.git(&["-C", &target, "rev-parse", "HEAD"]) {
            log::debug!(
                "[Signatures] Database at revision {}",
                String::from_utf8_lossy(&head.stdout).trim()
            );
        }

        Ok(())
    }
}
