//! Dependency install, build command and output discovery

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::deploy::sink::LogSink;
use crate::errors::DeployError;
use crate::models::stack::DetectedStack;
use crate::utils::format_duration;

/// Conventional output directories, checked after the detected one
pub const OUTPUT_DIR_CANDIDATES: &[&str] = &["dist", "build", "out", ".next", "public"];

/// Lines of command output kept for error messages and job logs
const OUTPUT_TAIL_LINES: usize = 20;

/// Build stage used by the orchestrator
#[async_trait]
pub trait ProjectBuilder: Send + Sync {
    /// Build the workspace and return the artifact directory to deploy
    async fn build(
        &self,
        workspace: &Path,
        stack: &DetectedStack,
        sink: &dyn LogSink,
    ) -> Result<PathBuf, DeployError>;
}

/// Build settings
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Run the package manager's install before the build command
    pub install_dependencies: bool,

    /// Upper bound for each spawned command
    pub command_timeout: Duration,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            install_dependencies: true,
            command_timeout: Duration::from_secs(15 * 60),
        }
    }
}

/// Runs build commands through `sh -c` inside the workspace
#[derive(Debug, Clone, Default)]
pub struct BuildExecutor {
    options: BuildOptions,
}

impl BuildExecutor {
    pub fn new(options: BuildOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    async fn run_command(
        &self,
        workspace: &Path,
        command: &str,
        sink: &dyn LogSink,
    ) -> Result<(), DeployError> {
        let started = Instant::now();
        let mut child = Command::new("sh");
        child
            .args(["-c", command])
            .current_dir(workspace)
            .env("CI", "true")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.options.command_timeout, child.output())
            .await
            .map_err(|_| {
                DeployError::BuildFailure(format!(
                    "`{}` timed out after {}",
                    command,
                    format_duration(self.options.command_timeout)
                ))
            })?
            .map_err(|e| DeployError::BuildFailure(format!("Failed to run `{}`: {}", command, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in tail(&stdout).iter().chain(tail(&stderr).iter()) {
            debug!("[{}] {}", command, line);
        }

        if !output.status.success() {
            let lines = tail(&stderr);
            let lines = if lines.is_empty() { tail(&stdout) } else { lines };
            for line in &lines {
                sink.warn(line).await;
            }
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            let reason = lines.last().cloned().unwrap_or_default();
            return Err(DeployError::BuildFailure(format!(
                "`{}` exited with {}{}{}",
                command,
                code,
                if reason.is_empty() { "" } else { ": " },
                reason
            )));
        }

        sink.info(&format!(
            "`{}` finished in {}",
            command,
            format_duration(started.elapsed())
        ))
        .await;
        Ok(())
    }
}

#[async_trait]
impl ProjectBuilder for BuildExecutor {
    async fn build(
        &self,
        workspace: &Path,
        stack: &DetectedStack,
        sink: &dyn LogSink,
    ) -> Result<PathBuf, DeployError> {
        if self.options.install_dependencies && is_file(&workspace.join("package.json")).await {
            sink.info(&format!(
                "Installing dependencies with {}...",
                stack.package_manager
            ))
            .await;
            self.run_command(workspace, stack.package_manager.install_command(), sink)
                .await?;
        }

        if let Some(build_cmd) = stack.build_cmd.as_deref() {
            sink.info(&format!("Running build command: {}", build_cmd)).await;
            self.run_command(workspace, build_cmd, sink).await?;
        }

        let artifact = locate_output(workspace, stack).await?;
        sink.info(&format!("Build output located at {}", artifact.display()))
            .await;
        Ok(artifact)
    }
}

/// Find the artifact directory of a built workspace
pub async fn locate_output(workspace: &Path, stack: &DetectedStack) -> Result<PathBuf, DeployError> {
    let mut candidates: Vec<&str> = Vec::new();
    if let Some(dist) = stack.dist_dir.as_deref() {
        candidates.push(dist);
    }
    candidates.extend(OUTPUT_DIR_CANDIDATES.iter().filter(|c| Some(**c) != stack.dist_dir.as_deref()));

    for candidate in &candidates {
        let path = if *candidate == "." {
            workspace.to_path_buf()
        } else {
            workspace.join(candidate)
        };
        if is_dir(&path).await {
            return Ok(path);
        }
    }

    // Server-side projects ship their sources
    if stack.project_type.is_server_side() {
        return Ok(workspace.to_path_buf());
    }

    Err(DeployError::BuildFailure(format!(
        "No build output directory found (checked: {})",
        candidates.join(", ")
    )))
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

fn tail(output: &str) -> Vec<String> {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    let skip = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
    lines[skip..].iter().map(|l| l.to_string()).collect()
}
