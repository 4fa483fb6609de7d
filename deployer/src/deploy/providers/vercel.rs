//! Vercel serverless hosting

use std::path::Path;

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::{error, info};

use crate::deploy::providers::{artifact_exists, base_result, site_slug, Provider};
use crate::deploy::registry::VERCEL;
use crate::errors::DeployError;
use crate::models::deployment::Environment;
use crate::models::provider::DeploymentResult;
use crate::models::stack::DetectedStack;

/// Vercel credentials
#[derive(Debug, Default)]
pub struct VercelConfig {
    pub access_token: Option<SecretString>,
}

#[derive(Debug)]
pub struct VercelProvider {
    config: VercelConfig,
}

impl VercelProvider {
    pub fn new(config: VercelConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Provider for VercelProvider {
    fn name(&self) -> &str {
        VERCEL
    }

    async fn deploy(
        &self,
        artifact: &Path,
        stack: &DetectedStack,
        environment: Environment,
    ) -> Result<DeploymentResult, DeployError> {
        if self.config.access_token.is_none() {
            error!("Vercel deployment failed: access token not configured");
            return Ok(DeploymentResult::failure("Vercel access token not configured"));
        }
        if !artifact_exists(artifact).await {
            return Ok(DeploymentResult::failure(format!(
                "Artifact {} does not exist",
                artifact.display()
            )));
        }

        info!("Deploying {} to Vercel...", stack.framework);
        let url = format!("https://deployify-{}.vercel.app", site_slug());
        Ok(base_result(url, VERCEL, environment).with_metadata("framework", stack.framework.clone()))
    }
}
