//! Provider variants
//!
//! Every variant satisfies [`Provider`]. Remote variants validate their own
//! credentials and report misconfiguration as an unsuccessful
//! [`DeploymentResult`] so the gateway can fall back to [`LocalProvider`].

pub mod amplify;
pub mod digitalocean;
pub mod local;
pub mod netlify;
pub mod vercel;

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;

use crate::errors::DeployError;
use crate::models::deployment::Environment;
use crate::models::provider::DeploymentResult;
use crate::models::stack::DetectedStack;

pub use amplify::{AmplifyConfig, AmplifyProvider};
pub use digitalocean::{DigitalOceanConfig, DigitalOceanProvider};
pub use local::{LocalConfig, LocalProvider};
pub use netlify::{NetlifyConfig, NetlifyProvider};
pub use vercel::{VercelConfig, VercelProvider};

/// Deploy capability of a hosting provider
#[async_trait]
pub trait Provider: Send + Sync {
    /// Registry key of this provider
    fn name(&self) -> &str;

    /// Ship the artifact directory
    async fn deploy(
        &self,
        artifact: &Path,
        stack: &DetectedStack,
        environment: Environment,
    ) -> Result<DeploymentResult, DeployError>;
}

/// Metadata every variant attaches to a successful result
pub(crate) fn base_result(url: String, provider: &str, environment: Environment) -> DeploymentResult {
    DeploymentResult::success(url)
        .with_metadata("provider", provider)
        .with_metadata("environment", environment.as_str())
        .with_metadata("deployedAt", Utc::now().to_rfc3339())
}

/// Short lowercase site slug
pub(crate) fn site_slug() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Remote variants refuse artifacts that are missing on disk
pub(crate) async fn artifact_exists(artifact: &Path) -> bool {
    tokio::fs::metadata(artifact)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}
