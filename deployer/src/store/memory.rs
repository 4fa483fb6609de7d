//! In-memory record store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::deploy::fsm::DeploymentStatus;
use crate::errors::DeployError;
use crate::models::deployment::{DeploymentRecord, DeploymentRequest, LogEntry, RecordUpdate};
use crate::store::{apply_status, DeploymentStore};
use crate::utils::generate_uuid;

/// Record store backed by a map, lost on restart
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<String, DeploymentRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DeploymentStore for MemoryStore {
    async fn create(&self, request: &DeploymentRequest) -> Result<String, DeployError> {
        let id = generate_uuid();
        let record = DeploymentRecord::new(id.clone(), request);
        self.records.write().await.insert(id.clone(), record);
        Ok(id)
    }

    async fn update_status(
        &self,
        id: &str,
        status: DeploymentStatus,
        update: RecordUpdate,
    ) -> Result<DeploymentRecord, DeployError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| DeployError::NotFound(format!("deployment {}", id)))?;
        apply_status(record, status, update)?;
        Ok(record.clone())
    }

    async fn append_log(&self, id: &str, entry: LogEntry) -> Result<(), DeployError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| DeployError::NotFound(format!("deployment {}", id)))?;
        record.logs.push(entry);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<DeploymentRecord, DeployError> {
        let records = self.records.read().await;
        records
            .get(id)
            .cloned()
            .ok_or_else(|| DeployError::NotFound(format!("deployment {}", id)))
    }
}
