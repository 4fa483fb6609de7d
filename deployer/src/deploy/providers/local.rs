//! Local static hosting, the guaranteed fallback provider

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::deploy::providers::{base_result, Provider};
use crate::deploy::registry::LOCAL;
use crate::errors::DeployError;
use crate::filesys::dir::Dir;
use crate::models::deployment::Environment;
use crate::models::provider::DeploymentResult;
use crate::models::stack::DetectedStack;

/// Prefix of every hosted site directory
const SITE_PREFIX: &str = "deploy";

/// Entries never published, at any depth of the artifact
const UNPUBLISHED: &[&str] = &[".git", ".hg", ".svn"];

/// Local provider settings
#[derive(Debug, Clone)]
pub struct LocalConfig {
    /// Directory the sites are copied into
    pub static_dir: PathBuf,

    /// Public URL the static directory is served under
    pub base_url: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            static_dir: PathBuf::from("static-hosting"),
            base_url: "http://localhost:3000/static".to_string(),
        }
    }
}

/// Copies artifacts into a directory served by this daemon
#[derive(Debug, Clone)]
pub struct LocalProvider {
    static_dir: Dir,
    base_url: String,
}

impl LocalProvider {
    pub fn new(config: LocalConfig) -> Self {
        Self {
            static_dir: Dir::new(config.static_dir),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn static_dir(&self) -> &Path {
        self.static_dir.path()
    }

    async fn copy_site(
        &self,
        artifact: &Path,
        environment: Environment,
    ) -> Result<DeploymentResult, DeployError> {
        self.static_dir.create().await?;
        let site = self.static_dir.unique_subdir(SITE_PREFIX);
        let site_id = site
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| DeployError::Internal("site directory has no name".to_string()))?;

        if let Err(e) = Dir::new(artifact).copy_to_excluding(&site, UNPUBLISHED).await {
            // leave no half-copied site behind
            let _ = site.delete().await;
            return Err(e);
        }

        let url = format!("{}/{}", self.base_url, site_id);
        Ok(base_result(url, LOCAL, environment)
            .with_metadata("artifactPath", artifact.display().to_string())
            .with_metadata("deploymentDir", site.path().display().to_string()))
    }

    /// Names of the hosted site directories
    pub async fn list_deployments(&self) -> Vec<String> {
        if !self.static_dir.exists().await {
            return Vec::new();
        }
        match self.static_dir.list_dir_names().await {
            Ok(names) => names,
            Err(e) => {
                warn!("Failed to list local deployments: {}", e);
                Vec::new()
            }
        }
    }

    /// Remove a hosted site, returning whether the removal succeeded
    pub async fn delete_deployment(&self, site_id: &str) -> bool {
        // only direct children of the hosting directory can be removed
        let valid = site_id.starts_with(SITE_PREFIX)
            && site_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            warn!("Refusing to delete local deployment '{}'", site_id);
            return false;
        }

        match self.static_dir.subdir(site_id).delete().await {
            Ok(()) => {
                info!("Deleted local deployment: {}", site_id);
                true
            }
            Err(e) => {
                error!("Failed to delete local deployment {}: {}", site_id, e);
                false
            }
        }
    }
}

impl Default for LocalProvider {
    fn default() -> Self {
        Self::new(LocalConfig::default())
    }
}

#[async_trait]
impl Provider for LocalProvider {
    fn name(&self) -> &str {
        LOCAL
    }

    async fn deploy(
        &self,
        artifact: &Path,
        stack: &DetectedStack,
        environment: Environment,
    ) -> Result<DeploymentResult, DeployError> {
        info!("Deploying {} to local static hosting...", stack.framework);

        match self.copy_site(artifact, environment).await {
            Ok(result) => {
                info!(
                    "Local deployment successful: {}",
                    result.url.as_deref().unwrap_or_default()
                );
                Ok(result)
            }
            Err(e) => {
                error!("Local deployment failed: {}", e);
                Ok(DeploymentResult::failure(e.to_string()))
            }
        }
    }
}
