//! Deployment job state machine
//!
//! One call to [`Orchestrator::run_job`] drives a queued record through
//! `cloning → detecting → building → deploying → success`. Every stage returns a
//! `Result`; the first error moves the record to `failed`. The record is checked
//! for cancellation between stages, never during a blocking call. The scoped
//! workspace is removed exactly once on every exit path.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::deploy::builder::{BuildExecutor, ProjectBuilder};
use crate::deploy::detector::StackDetector;
use crate::deploy::fsm::DeploymentStatus;
use crate::deploy::gateway::ProviderGateway;
use crate::deploy::git::{GitCloner, RepoCloner};
use crate::deploy::selector::ProviderSelector;
use crate::deploy::sink::{LogSink, StoreLogSink};
use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::models::deployment::{DeploymentRecord, DeploymentRequest, RecordUpdate};
use crate::store::DeploymentStore;
use crate::utils::elapsed_secs;

/// Prefix of per-job clone directories
pub const WORKSPACE_PREFIX: &str = "repo";

/// Why a job stopped before `success`
#[derive(Debug)]
enum Halt {
    Cancelled,
    Failed(DeployError),
}

impl From<DeployError> for Halt {
    fn from(err: DeployError) -> Self {
        Halt::Failed(err)
    }
}

/// Drives deployment jobs end to end
pub struct Orchestrator {
    store: Arc<dyn DeploymentStore>,
    gateway: Arc<ProviderGateway>,
    cloner: Arc<dyn RepoCloner>,
    builder: Arc<dyn ProjectBuilder>,
    detector: StackDetector,
    selector: ProviderSelector,
    workspaces: Dir,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn DeploymentStore>,
        gateway: Arc<ProviderGateway>,
        workspaces: Dir,
    ) -> Self {
        Self {
            store,
            gateway,
            cloner: Arc::new(GitCloner::default()),
            builder: Arc::new(BuildExecutor::default()),
            detector: StackDetector::new(),
            selector: ProviderSelector::default(),
            workspaces,
        }
    }

    pub fn with_cloner(mut self, cloner: Arc<dyn RepoCloner>) -> Self {
        self.cloner = cloner;
        self
    }

    pub fn with_builder(mut self, builder: Arc<dyn ProjectBuilder>) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_selector(mut self, selector: ProviderSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn store(&self) -> &Arc<dyn DeploymentStore> {
        &self.store
    }

    /// Run one job and return its final record.
    ///
    /// Fails only when the record cannot be read; pipeline errors end up on the
    /// record as `failed`.
    pub async fn run_job(&self, id: &str) -> Result<DeploymentRecord, DeployError> {
        let record = self.store.get(id).await?;
        if record.status.is_terminal() {
            info!("Deployment {} is already {}, skipping", id, record.status);
            return Ok(record);
        }

        let sink = StoreLogSink::new(self.store.clone(), id);
        let workspace = self.workspaces.unique_subdir(WORKSPACE_PREFIX);

        let outcome = if record.status == DeploymentStatus::Queued {
            self.run_stages(id, &record.request(), workspace.path(), &sink)
                .await
        } else {
            Err(Halt::Failed(DeployError::Internal(format!(
                "Deployment was interrupted while {}",
                record.status
            ))))
        };

        match outcome {
            Ok(()) => {}
            Err(Halt::Cancelled) => {
                sink.warn("Deployment cancelled").await;
            }
            Err(Halt::Failed(e)) => self.fail(id, &e, &sink).await,
        }

        if let Err(e) = self.cloner.cleanup(workspace.path()).await {
            sink.warn(&format!(
                "Failed to clean up workspace {}: {}",
                workspace.path().display(),
                e
            ))
            .await;
        }

        self.store.get(id).await
    }

    async fn run_stages(
        &self,
        id: &str,
        request: &DeploymentRequest,
        workspace: &Path,
        sink: &dyn LogSink,
    ) -> Result<(), Halt> {
        let started_at = Utc::now();
        sink.info("Starting deployment process...").await;

        // queued -> cloning
        self.advance(
            id,
            DeploymentStatus::Cloning,
            RecordUpdate {
                started_at: Some(started_at),
                ..Default::default()
            },
        )
        .await?;
        sink.info(&format!("Cloning repository {}...", request.repo_url))
            .await;
        self.cloner
            .clone_repo(&request.repo_url, &request.branch, workspace)
            .await?;

        // cloning -> detecting
        self.checkpoint(id).await?;
        self.advance(id, DeploymentStatus::Detecting, RecordUpdate::default())
            .await?;
        sink.info("Analyzing project structure...").await;
        let stack = self.detector.analyze(workspace).await;
        self.advance(
            id,
            DeploymentStatus::Detecting,
            RecordUpdate {
                detected_stack: Some(stack.clone()),
                ..Default::default()
            },
        )
        .await?;
        sink.info(&format!(
            "Detected {} ({}) project",
            stack.framework, stack.project_type
        ))
        .await;

        let provider = self.selector.select(
            &stack,
            request.environment,
            request.budget,
            &request.prefer_providers,
        )?;
        sink.info(&format!("Selected provider: {}", provider)).await;

        // detecting -> building
        self.checkpoint(id).await?;
        self.advance(
            id,
            DeploymentStatus::Building,
            RecordUpdate {
                provider: Some(provider.clone()),
                ..Default::default()
            },
        )
        .await?;
        let artifact = self.builder.build(workspace, &stack, sink).await?;

        // building -> deploying
        self.checkpoint(id).await?;
        self.advance(id, DeploymentStatus::Deploying, RecordUpdate::default())
            .await?;
        sink.info(&format!("Deploying to {}...", provider)).await;
        let result = self
            .gateway
            .deploy_to_provider(&provider, &artifact, &stack, request.environment, sink)
            .await;

        if !result.success {
            let reason = result
                .error
                .unwrap_or_else(|| "provider reported failure".to_string());
            return Err(DeployError::ProviderDeployFailure(reason).into());
        }
        let url = result
            .url
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                DeployError::ProviderDeployFailure("provider returned no URL".to_string())
            })?;

        let served_by = result.provider().unwrap_or(&provider).to_string();
        if served_by != provider {
            sink.warn(&format!("Deployed with fallback provider {}", served_by))
                .await;
        }

        // deploying -> success
        let completed_at = Utc::now();
        self.advance(
            id,
            DeploymentStatus::Success,
            RecordUpdate {
                provider: Some(served_by),
                deployment_url: Some(url.clone()),
                completed_at: Some(completed_at),
                build_duration: Some(elapsed_secs(started_at, completed_at)),
                ..Default::default()
            },
        )
        .await?;
        sink.info(&format!("Deployment successful! Available at: {}", url))
            .await;

        Ok(())
    }

    /// Stop if the record was cancelled since the last stage
    async fn checkpoint(&self, id: &str) -> Result<(), Halt> {
        let record = self.store.get(id).await?;
        if record.status.is_terminal() {
            return Err(Halt::Cancelled);
        }
        Ok(())
    }

    async fn advance(
        &self,
        id: &str,
        status: DeploymentStatus,
        update: RecordUpdate,
    ) -> Result<(), Halt> {
        match self.store.update_status(id, status, update).await {
            Ok(_) => Ok(()),
            // a concurrent cancel makes every further transition invalid
            Err(e @ DeployError::InvalidTransition { .. }) => match self.store.get(id).await {
                Ok(record) if record.status == DeploymentStatus::Cancelled => Err(Halt::Cancelled),
                _ => Err(Halt::Failed(e)),
            },
            Err(e) => Err(Halt::Failed(e)),
        }
    }

    async fn fail(&self, id: &str, error: &DeployError, sink: &dyn LogSink) {
        let message = error.to_string();
        let completed_at = Utc::now();
        let update = RecordUpdate {
            error_message: Some(message.clone()),
            completed_at: Some(completed_at),
            ..Default::default()
        };

        // a record cancelled mid-stage keeps its cancelled status and log
        match self
            .store
            .update_status(id, DeploymentStatus::Failed, update)
            .await
        {
            Ok(_) => sink.error(&format!("Deployment failed: {}", message)).await,
            Err(e) => warn!("Could not mark deployment {} as failed: {}", id, e),
        }
    }
}

/// Seconds a finished record took, for summaries
pub fn record_duration(record: &DeploymentRecord) -> Option<i64> {
    record.build_duration.or_else(|| {
        let started: DateTime<Utc> = record.started_at?;
        let completed = record.completed_at?;
        Some(elapsed_secs(started, completed))
    })
}
