//! File-backed record store, one JSON document per deployment

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::deploy::fsm::DeploymentStatus;
use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::models::deployment::{DeploymentRecord, DeploymentRequest, LogEntry, RecordUpdate};
use crate::store::{apply_status, DeploymentStore};
use crate::utils::generate_uuid;

/// Record store persisting `<records_dir>/<id>.json`
pub struct FileStore {
    dir: Dir,
    // Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store, creating the records directory if needed
    pub async fn open(dir: Dir) -> Result<Self, DeployError> {
        dir.create().await?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn record_file(&self, id: &str) -> Result<File, DeployError> {
        // Ids are generated uuids; anything else must not escape the directory
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(DeployError::NotFound(format!("deployment {}", id)));
        }
        Ok(self.dir.file(&format!("{}.json", id)))
    }

    async fn load(&self, id: &str) -> Result<DeploymentRecord, DeployError> {
        let file = self.record_file(id)?;
        if !file.exists().await {
            return Err(DeployError::NotFound(format!("deployment {}", id)));
        }
        file.read_json().await
    }

    async fn save(&self, record: &DeploymentRecord) -> Result<(), DeployError> {
        let file = self.record_file(&record.id)?;
        file.write_json_atomic(record).await
    }
}

#[async_trait]
impl DeploymentStore for FileStore {
    async fn create(&self, request: &DeploymentRequest) -> Result<String, DeployError> {
        let _guard = self.write_lock.lock().await;
        let id = generate_uuid();
        let record = DeploymentRecord::new(id.clone(), request);
        self.save(&record).await?;
        debug!("Stored new deployment record {}", id);
        Ok(id)
    }

    async fn update_status(
        &self,
        id: &str,
        status: DeploymentStatus,
        update: RecordUpdate,
    ) -> Result<DeploymentRecord, DeployError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load(id).await?;
        apply_status(&mut record, status, update)?;
        self.save(&record).await?;
        Ok(record)
    }

    async fn append_log(&self, id: &str, entry: LogEntry) -> Result<(), DeployError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load(id).await?;
        record.logs.push(entry);
        self.save(&record).await
    }

    async fn get(&self, id: &str) -> Result<DeploymentRecord, DeployError> {
        self.load(id).await
    }
}
