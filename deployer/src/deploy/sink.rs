//! Job log sinks
//!
//! Pipeline stages report progress through a [`LogSink`] handed to them by the
//! orchestrator instead of logging ambiently, so a job's log lines end up on its
//! record and tests can capture them.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::models::deployment::{LogEntry, LogLevel};
use crate::store::DeploymentStore;

/// Receives the log lines of one deployment job
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn log(&self, level: LogLevel, message: &str);

    async fn info(&self, message: &str) {
        self.log(LogLevel::Info, message).await;
    }

    async fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message).await;
    }

    async fn error(&self, message: &str) {
        self.log(LogLevel::Error, message).await;
    }
}

/// Appends entries to a deployment record and mirrors them to tracing
pub struct StoreLogSink {
    store: Arc<dyn DeploymentStore>,
    deployment_id: String,
}

impl StoreLogSink {
    pub fn new(store: Arc<dyn DeploymentStore>, deployment_id: impl Into<String>) -> Self {
        Self {
            store,
            deployment_id: deployment_id.into(),
        }
    }

    pub fn deployment_id(&self) -> &str {
        &self.deployment_id
    }
}

#[async_trait]
impl LogSink for StoreLogSink {
    async fn log(&self, level: LogLevel, message: &str) {
        let id = self.deployment_id.as_str();
        match level {
            LogLevel::Debug => debug!(deployment_id = id, "{}", message),
            LogLevel::Info => info!(deployment_id = id, "{}", message),
            LogLevel::Warn => warn!(deployment_id = id, "{}", message),
            LogLevel::Error => error!(deployment_id = id, "{}", message),
        }

        // A lost log line must not fail the job
        if let Err(e) = self.store.append_log(id, LogEntry::new(level, message)).await {
            warn!(deployment_id = id, "Failed to persist log entry: {}", e);
        }
    }
}

/// Sink that only forwards to tracing, for work outside a deployment record
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl LogSink for TracingSink {
    async fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => debug!("{}", message),
            LogLevel::Info => info!("{}", message),
            LogLevel::Warn => warn!("{}", message),
            LogLevel::Error => error!("{}", message),
        }
    }
}
