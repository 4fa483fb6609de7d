//! Repository cloning

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::DeployError;
use crate::filesys::dir::Dir;

/// Clone capability used by the orchestrator
#[async_trait]
pub trait RepoCloner: Send + Sync {
    /// Shallow-clone `branch` of `repo_url` into `target`
    async fn clone_repo(&self, repo_url: &str, branch: &str, target: &Path)
        -> Result<(), DeployError>;

    /// Remove a workspace. Must succeed when `workspace` does not exist.
    async fn cleanup(&self, workspace: &Path) -> Result<(), DeployError>;
}

/// Clones with the system `git` binary
#[derive(Debug, Clone)]
pub struct GitCloner {
    timeout: Duration,
}

impl GitCloner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for GitCloner {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

#[async_trait]
impl RepoCloner for GitCloner {
    async fn clone_repo(
        &self,
        repo_url: &str,
        branch: &str,
        target: &Path,
    ) -> Result<(), DeployError> {
        info!("Cloning {} (branch: {}) to {}", repo_url, branch, target.display());

        let mut command = Command::new("git");
        command
            .args(["clone", "--depth", "1", "--branch", branch, repo_url])
            .arg(target)
            // never block on a credential prompt for private or missing repos
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                DeployError::CloneFailure(format!(
                    "git clone timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| DeployError::CloneFailure(format!("Failed to run git clone: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("git clone exited with an error")
                .trim()
                .to_string();
            return Err(DeployError::CloneFailure(reason));
        }

        debug!("Clone of {} complete", repo_url);
        Ok(())
    }

    async fn cleanup(&self, workspace: &Path) -> Result<(), DeployError> {
        debug!("Removing workspace {}", workspace.display());
        Dir::new(workspace).delete().await
    }
}
