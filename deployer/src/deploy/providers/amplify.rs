//! AWS Amplify hosting

use std::path::Path;

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::{error, info};

use crate::deploy::providers::{artifact_exists, base_result, site_slug, Provider};
use crate::deploy::registry::AWS_AMPLIFY;
use crate::errors::DeployError;
use crate::models::deployment::Environment;
use crate::models::provider::DeploymentResult;
use crate::models::stack::DetectedStack;

pub const DEFAULT_REGION: &str = "us-east-1";

/// AWS credentials and target region
#[derive(Debug)]
pub struct AmplifyConfig {
    pub access_key_id: Option<SecretString>,
    pub secret_access_key: Option<SecretString>,
    pub region: String,
}

impl Default for AmplifyConfig {
    fn default() -> Self {
        Self {
            access_key_id: None,
            secret_access_key: None,
            region: DEFAULT_REGION.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct AmplifyProvider {
    config: AmplifyConfig,
}

impl AmplifyProvider {
    pub fn new(config: AmplifyConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Provider for AmplifyProvider {
    fn name(&self) -> &str {
        AWS_AMPLIFY
    }

    async fn deploy(
        &self,
        artifact: &Path,
        stack: &DetectedStack,
        environment: Environment,
    ) -> Result<DeploymentResult, DeployError> {
        if self.config.access_key_id.is_none() || self.config.secret_access_key.is_none() {
            error!("AWS Amplify deployment failed: credentials not configured");
            return Ok(DeploymentResult::failure("AWS credentials not configured"));
        }
        if !artifact_exists(artifact).await {
            return Ok(DeploymentResult::failure(format!(
                "Artifact {} does not exist",
                artifact.display()
            )));
        }

        info!(
            "Deploying {} to AWS Amplify in {}...",
            stack.framework, self.config.region
        );
        let url = format!("https://main.d{}.amplifyapp.com", site_slug());
        Ok(base_result(url, AWS_AMPLIFY, environment)
            .with_metadata("region", self.config.region.clone())
            .with_metadata("framework", stack.framework.clone()))
    }
}
