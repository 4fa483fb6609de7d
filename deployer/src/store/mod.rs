//! Deployment record store
//!
//! The orchestrator is the only writer of a given record. Implementations must
//! make every call atomic for a single record and must refuse status updates
//! that leave a terminal status or move backwards.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use chrono::Utc;

use crate::deploy::fsm::DeploymentStatus;
use crate::errors::DeployError;
use crate::models::deployment::{DeploymentRecord, DeploymentRequest, LogEntry, RecordUpdate};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Persistence contract for deployment records
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    /// Persist a new queued record and return its id
    async fn create(&self, request: &DeploymentRequest) -> Result<String, DeployError>;

    /// Move the record to `status` and merge `update` into it
    async fn update_status(
        &self,
        id: &str,
        status: DeploymentStatus,
        update: RecordUpdate,
    ) -> Result<DeploymentRecord, DeployError>;

    /// Append a log entry to the record
    async fn append_log(&self, id: &str, entry: LogEntry) -> Result<(), DeployError>;

    /// Fetch a record by id
    async fn get(&self, id: &str) -> Result<DeploymentRecord, DeployError>;

    /// Cancel a non-terminal record
    async fn cancel(&self, id: &str) -> Result<DeploymentRecord, DeployError> {
        self.update_status(
            id,
            DeploymentStatus::Cancelled,
            RecordUpdate {
                completed_at: Some(Utc::now()),
                ..Default::default()
            },
        )
        .await
    }
}

/// Validate and apply a status change to an in-memory record
pub(crate) fn apply_status(
    record: &mut DeploymentRecord,
    status: DeploymentStatus,
    update: RecordUpdate,
) -> Result<(), DeployError> {
    record.status = record.status.transition(status)?;
    update.apply(record);
    record.updated_at = Utc::now();
    Ok(())
}
