//! Directory operations

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tokio::fs;

use crate::errors::DeployError;
use crate::filesys::file::File;

/// A directory wrapper with path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    /// Create a new directory reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the directory exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Create the directory (and parents)
    pub async fn create(&self) -> Result<(), DeployError> {
        fs::create_dir_all(&self.path).await?;
        Ok(())
    }

    /// Delete the directory and all contents; a missing directory is not an error
    pub async fn delete(&self) -> Result<(), DeployError> {
        match fs::remove_dir_all(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// List subdirectory names
    pub async fn list_dir_names(&self) -> Result<Vec<String>, DeployError> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.path).await?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Get a file within this directory
    pub fn file(&self, name: &str) -> File {
        File::new(self.path.join(name))
    }

    /// Get a subdirectory
    pub fn subdir(&self, name: &str) -> Dir {
        Dir::new(self.path.join(name))
    }

    /// Reference a not-yet-created subdirectory with a collision-free name
    pub fn unique_subdir(&self, prefix: &str) -> Dir {
        self.subdir(&format!("{}-{}", prefix, uuid::Uuid::new_v4()))
    }

    /// Recursively copy the contents of this directory into `dest`
    pub async fn copy_to(&self, dest: &Dir) -> Result<(), DeployError> {
        self.copy_to_excluding(dest, &[]).await
    }

    /// Recursively copy into `dest`, skipping entries named in `exclude` at any depth
    pub async fn copy_to_excluding(&self, dest: &Dir, exclude: &[&str]) -> Result<(), DeployError> {
        let exclude: Arc<Vec<String>> = Arc::new(exclude.iter().map(|s| s.to_string()).collect());
        copy_recursive(self.path.clone(), dest.path.clone(), exclude).await
    }
}

fn copy_recursive(
    src: PathBuf,
    dest: PathBuf,
    exclude: Arc<Vec<String>>,
) -> Pin<Box<dyn Future<Output = Result<(), DeployError>> + Send>> {
    Box::pin(async move {
        fs::create_dir_all(&dest).await?;
        let mut entries = fs::read_dir(&src).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if exclude.iter().any(|e| name.as_os_str() == e.as_str()) {
                continue;
            }
            let file_type = entry.file_type().await?;
            let target = dest.join(&name);
            if file_type.is_dir() {
                copy_recursive(entry.path(), target, exclude.clone()).await?;
            } else if file_type.is_file() {
                fs::copy(entry.path(), &target).await?;
            }
        }

        Ok(())
    })
}
