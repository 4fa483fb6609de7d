//! DigitalOcean App Platform

use std::path::Path;

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::{error, info};

use crate::deploy::providers::{artifact_exists, base_result, site_slug, Provider};
use crate::deploy::registry::DIGITALOCEAN;
use crate::errors::DeployError;
use crate::models::deployment::Environment;
use crate::models::provider::DeploymentResult;
use crate::models::stack::DetectedStack;

/// DigitalOcean credentials
#[derive(Debug, Default)]
pub struct DigitalOceanConfig {
    pub access_token: Option<SecretString>,
}

#[derive(Debug)]
pub struct DigitalOceanProvider {
    config: DigitalOceanConfig,
}

impl DigitalOceanProvider {
    pub fn new(config: DigitalOceanConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Provider for DigitalOceanProvider {
    fn name(&self) -> &str {
        DIGITALOCEAN
    }

    async fn deploy(
        &self,
        artifact: &Path,
        stack: &DetectedStack,
        environment: Environment,
    ) -> Result<DeploymentResult, DeployError> {
        if self.config.access_token.is_none() {
            error!("DigitalOcean deployment failed: access token not configured");
            return Ok(DeploymentResult::failure(
                "DigitalOcean access token not configured",
            ));
        }
        if !artifact_exists(artifact).await {
            return Ok(DeploymentResult::failure(format!(
                "Artifact {} does not exist",
                artifact.display()
            )));
        }

        info!("Deploying {} to DigitalOcean App Platform...", stack.framework);
        let url = format!("https://deployify-{}.ondigitalocean.app", site_slug());
        let mut result = base_result(url, DIGITALOCEAN, environment)
            .with_metadata("type", stack.project_type.as_str());
        if let Some(port) = stack.port_hint {
            result = result.with_metadata("httpPort", port.to_string());
        }
        Ok(result)
    }
}
