//! Request intake

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use url::Url;

use crate::deploy::fsm::DeploymentStatus;
use crate::errors::DeployError;
use crate::models::deployment::{DeploymentRecord, DeploymentRequest, LogEntry, LogLevel, RecordUpdate};
use crate::store::DeploymentStore;

/// Validates requests, persists them as queued records and hands their ids
/// to the deployer worker
#[derive(Clone)]
pub struct JobQueue {
    store: Arc<dyn DeploymentStore>,
    sender: mpsc::Sender<String>,
    known_providers: Vec<String>,
}

impl JobQueue {
    pub fn new(
        store: Arc<dyn DeploymentStore>,
        sender: mpsc::Sender<String>,
        known_providers: Vec<String>,
    ) -> Self {
        Self {
            store,
            sender,
            known_providers,
        }
    }

    /// Queue a new deployment and return its id
    pub async fn submit(&self, request: DeploymentRequest) -> Result<String, DeployError> {
        validate_request(&request, &self.known_providers)?;

        let id = self.store.create(&request).await?;
        self.store
            .append_log(
                &id,
                LogEntry::new(
                    LogLevel::Info,
                    format!("Deployment queued for {} ({})", request.repo_url, request.branch),
                ),
            )
            .await?;

        if self.sender.send(id.clone()).await.is_err() {
            warn!("Deployer worker is not running, failing deployment {}", id);
            let update = RecordUpdate {
                error_message: Some("Deployment worker is not running".to_string()),
                completed_at: Some(Utc::now()),
                ..Default::default()
            };
            self.store
                .update_status(&id, DeploymentStatus::Failed, update)
                .await?;
            return Err(DeployError::ServerError(
                "Deployment worker is not running".to_string(),
            ));
        }

        info!(
            "Queued deployment {} for {} ({}, {} budget)",
            id, request.repo_url, request.environment, request.budget
        );
        Ok(id)
    }

    /// Cancel a queued or running deployment
    pub async fn cancel(&self, id: &str) -> Result<DeploymentRecord, DeployError> {
        let record = self.store.get(id).await?;
        if record.status.is_terminal() {
            return Err(DeployError::ValidationError(format!(
                "Deployment {} is already {}",
                id, record.status
            )));
        }

        let record = self.store.cancel(id).await?;
        self.store
            .append_log(id, LogEntry::new(LogLevel::Warn, "Cancellation requested"))
            .await?;
        info!("Cancelled deployment {}", id);
        Ok(record)
    }

    pub fn store(&self) -> &Arc<dyn DeploymentStore> {
        &self.store
    }
}

/// Check a request before it is persisted
pub fn validate_request(
    request: &DeploymentRequest,
    known_providers: &[String],
) -> Result<(), DeployError> {
    let url = Url::parse(&request.repo_url).map_err(|e| {
        DeployError::ValidationError(format!("Invalid repository URL '{}': {}", request.repo_url, e))
    })?;
    if url.scheme() != "https" || url.host_str().is_none() {
        return Err(DeployError::ValidationError(
            "Repository URL must be a valid HTTPS URL".to_string(),
        ));
    }

    let branch = request.branch.trim();
    if branch.is_empty() || branch.starts_with('-') || branch.chars().any(char::is_whitespace) {
        return Err(DeployError::ValidationError(format!(
            "Invalid branch name '{}'",
            request.branch
        )));
    }

    if let Some(unknown) = request
        .prefer_providers
        .iter()
        .find(|p| !known_providers.contains(p))
    {
        return Err(DeployError::ValidationError(format!(
            "Unknown provider '{}'",
            unknown
        )));
    }

    Ok(())
}
