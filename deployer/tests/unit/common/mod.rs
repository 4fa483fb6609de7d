//! Shared test doubles

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use deployify::deploy::builder::ProjectBuilder;
use deployify::deploy::git::RepoCloner;
use deployify::deploy::providers::Provider;
use deployify::deploy::sink::LogSink;
use deployify::errors::DeployError;
use deployify::models::deployment::{Environment, LogLevel};
use deployify::models::provider::DeploymentResult;
use deployify::models::stack::{DetectedStack, ProjectType};
use deployify::store::DeploymentStore;

pub fn stack(project_type: ProjectType, framework: &str) -> DetectedStack {
    DetectedStack {
        project_type,
        framework: framework.to_string(),
        ..DetectedStack::fallback()
    }
}

/// Sink that keeps every line
#[derive(Default)]
pub struct CaptureSink {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl CaptureSink {
    pub fn messages(&self) -> Vec<String> {
        self.lines.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.lines.lock().unwrap().iter().filter(|(l, _)| *l == level).count()
    }
}

#[async_trait]
impl LogSink for CaptureSink {
    async fn log(&self, level: LogLevel, message: &str) {
        self.lines.lock().unwrap().push((level, message.to_string()));
    }
}

/// What a [`FakeProvider`] answers
#[derive(Clone)]
pub enum Outcome {
    Success(String),
    SoftFailure(String),
    Error(String),
}

/// Provider that records how often it was asked to deploy
pub struct FakeProvider {
    name: String,
    outcome: Outcome,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new(name: &str, outcome: Outcome) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            outcome,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deploy(
        &self,
        _artifact: &Path,
        _stack: &DetectedStack,
        _environment: Environment,
    ) -> Result<DeploymentResult, DeployError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Outcome::Success(url) => Ok(DeploymentResult::success(url.clone())),
            Outcome::SoftFailure(reason) => Ok(DeploymentResult::failure(reason.clone())),
            Outcome::Error(reason) => Err(DeployError::ProviderDeployFailure(reason.clone())),
        }
    }
}

/// Cloner that writes fixture files instead of running git
pub struct FakeCloner {
    files: Vec<(String, String)>,
    failure: Option<String>,
    clones: AtomicUsize,
    cleanups: AtomicUsize,
    workspaces: Mutex<Vec<PathBuf>>,
}

impl FakeCloner {
    pub fn with_files(files: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            files: files
                .iter()
                .map(|(name, body)| (name.to_string(), body.to_string()))
                .collect(),
            failure: None,
            clones: AtomicUsize::new(0),
            cleanups: AtomicUsize::new(0),
            workspaces: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            files: Vec::new(),
            failure: Some(reason.to_string()),
            clones: AtomicUsize::new(0),
            cleanups: AtomicUsize::new(0),
            workspaces: Mutex::new(Vec::new()),
        })
    }

    pub fn clones(&self) -> usize {
        self.clones.load(Ordering::SeqCst)
    }

    pub fn cleanups(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }

    pub fn workspaces(&self) -> Vec<PathBuf> {
        self.workspaces.lock().unwrap().clone()
    }
}

#[async_trait]
impl RepoCloner for FakeCloner {
    async fn clone_repo(
        &self,
        _repo_url: &str,
        _branch: &str,
        target: &Path,
    ) -> Result<(), DeployError> {
        self.clones.fetch_add(1, Ordering::SeqCst);
        self.workspaces.lock().unwrap().push(target.to_path_buf());

        tokio::fs::create_dir_all(target).await?;
        if let Some(reason) = &self.failure {
            // leave a partial checkout behind, like an interrupted clone
            tokio::fs::write(target.join(".partial"), b"").await?;
            return Err(DeployError::CloneFailure(reason.clone()));
        }
        for (name, body) in &self.files {
            let path = target.join(name);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, body).await?;
        }
        Ok(())
    }

    async fn cleanup(&self, workspace: &Path) -> Result<(), DeployError> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        match tokio::fs::remove_dir_all(workspace).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Builder whose build command always exits non-zero
pub struct FailingBuilder;

#[async_trait]
impl ProjectBuilder for FailingBuilder {
    async fn build(
        &self,
        _workspace: &Path,
        stack: &DetectedStack,
        sink: &dyn LogSink,
    ) -> Result<PathBuf, DeployError> {
        let cmd = stack.build_cmd.clone().unwrap_or_else(|| "npm run build".to_string());
        sink.error(&format!("{} exited with code 1", cmd)).await;
        Err(DeployError::BuildFailure(format!("`{}` exited with 1", cmd)))
    }
}

/// Cloner that cancels its deployment while the clone is in progress
pub struct CancellingCloner {
    store: Arc<dyn DeploymentStore>,
    id: String,
    failure: Option<String>,
    cleanups: AtomicUsize,
}

impl CancellingCloner {
    pub fn new(store: Arc<dyn DeploymentStore>, id: &str) -> Arc<Self> {
        Arc::new(Self {
            store,
            id: id.to_string(),
            failure: None,
            cleanups: AtomicUsize::new(0),
        })
    }

    /// Cancel, then report the clone as failed
    pub fn failing(store: Arc<dyn DeploymentStore>, id: &str, reason: &str) -> Arc<Self> {
        Arc::new(Self {
            store,
            id: id.to_string(),
            failure: Some(reason.to_string()),
            cleanups: AtomicUsize::new(0),
        })
    }

    pub fn cleanups(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RepoCloner for CancellingCloner {
    async fn clone_repo(
        &self,
        _repo_url: &str,
        _branch: &str,
        target: &Path,
    ) -> Result<(), DeployError> {
        tokio::fs::create_dir_all(target).await?;
        tokio::fs::write(target.join("index.html"), "<h1>hello</h1>").await?;
        self.store.cancel(&self.id).await?;
        match &self.failure {
            Some(reason) => Err(DeployError::CloneFailure(reason.clone())),
            None => Ok(()),
        }
    }

    async fn cleanup(&self, workspace: &Path) -> Result<(), DeployError> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        match tokio::fs::remove_dir_all(workspace).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Builder that counts calls and never produces an artifact
#[derive(Default)]
pub struct CountingBuilder {
    calls: AtomicUsize,
}

impl CountingBuilder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProjectBuilder for CountingBuilder {
    async fn build(
        &self,
        workspace: &Path,
        _stack: &DetectedStack,
        _sink: &dyn LogSink,
    ) -> Result<PathBuf, DeployError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(workspace.to_path_buf())
    }
}
