//! Netlify static hosting

use std::path::Path;

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::{error, info};

use crate::deploy::providers::{artifact_exists, base_result, site_slug, Provider};
use crate::deploy::registry::NETLIFY;
use crate::errors::DeployError;
use crate::models::deployment::Environment;
use crate::models::provider::DeploymentResult;
use crate::models::stack::DetectedStack;

/// Netlify credentials
#[derive(Debug, Default)]
pub struct NetlifyConfig {
    pub access_token: Option<SecretString>,
}

#[derive(Debug)]
pub struct NetlifyProvider {
    config: NetlifyConfig,
}

impl NetlifyProvider {
    pub fn new(config: NetlifyConfig) -> Self {
        Self { config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.access_token.is_some()
    }
}

#[async_trait]
impl Provider for NetlifyProvider {
    fn name(&self) -> &str {
        NETLIFY
    }

    async fn deploy(
        &self,
        artifact: &Path,
        stack: &DetectedStack,
        environment: Environment,
    ) -> Result<DeploymentResult, DeployError> {
        if !self.is_configured() {
            error!("Netlify deployment failed: access token not configured");
            return Ok(DeploymentResult::failure("Netlify access token not configured"));
        }
        if !artifact_exists(artifact).await {
            return Ok(DeploymentResult::failure(format!(
                "Artifact {} does not exist",
                artifact.display()
            )));
        }

        info!("Deploying {} to Netlify...", stack.framework);
        let url = format!("https://deployify-{}.netlify.app", site_slug());
        Ok(base_result(url, NETLIFY, environment))
    }
}
