//! Provider dispatch with one-shot local fallback

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::deploy::providers::Provider;
use crate::deploy::sink::LogSink;
use crate::errors::DeployError;
use crate::models::deployment::Environment;
use crate::models::provider::DeploymentResult;
use crate::models::stack::DetectedStack;

/// Name-keyed set of provider variants, resolved once at startup.
///
/// The fallback variant is always registered and is retried exactly once when
/// another variant fails, softly or with an error.
pub struct ProviderGateway {
    providers: HashMap<String, Arc<dyn Provider>>,
    fallback: Arc<dyn Provider>,
}

impl ProviderGateway {
    pub fn new(fallback: Arc<dyn Provider>) -> Self {
        let mut providers: HashMap<String, Arc<dyn Provider>> = HashMap::new();
        providers.insert(fallback.name().to_string(), fallback.clone());
        Self {
            providers,
            fallback,
        }
    }

    /// Register a variant under its own name, replacing any previous one
    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(provider.name().to_string(), provider);
        self
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn fallback_name(&self) -> &str {
        self.fallback.name()
    }

    /// Sorted names of the registered variants
    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Deploy with `name`, falling back to the local variant once
    pub async fn deploy_to_provider(
        &self,
        name: &str,
        artifact: &Path,
        stack: &DetectedStack,
        environment: Environment,
        sink: &dyn LogSink,
    ) -> DeploymentResult {
        let attempt = match self.providers.get(name) {
            Some(provider) => provider.deploy(artifact, stack, environment).await,
            None => Err(DeployError::UnknownProvider(name.to_string())),
        };
        let is_fallback = name == self.fallback.name();

        match attempt {
            Ok(result) if result.success => tag_provider(result, name),
            Ok(result) if is_fallback => tag_provider(result, name),
            Ok(result) => {
                let reason = result.error.unwrap_or_else(|| "unknown error".to_string());
                sink.warn(&format!(
                    "{} deployment failed: {}. Falling back to {}...",
                    name,
                    reason,
                    self.fallback.name()
                ))
                .await;

                match self.fallback.deploy(artifact, stack, environment).await {
                    Ok(result) => self.tag_fallback(result, name),
                    Err(e) => {
                        warn!("Fallback deployment errored: {}", e);
                        DeploymentResult::failure(e.to_string())
                    }
                }
            }
            Err(e) if is_fallback => {
                warn!("{} deployment errored: {}", name, e);
                tag_provider(DeploymentResult::failure(e.to_string()), name)
            }
            Err(e) => {
                sink.warn(&format!(
                    "{} deployment errored: {}. Falling back to {}...",
                    name,
                    e,
                    self.fallback.name()
                ))
                .await;

                match self.fallback.deploy(artifact, stack, environment).await {
                    Ok(result) if result.success => self.tag_fallback(result, name),
                    Ok(result) => {
                        debug!("Fallback also failed: {:?}", result.error);
                        DeploymentResult::failure(e.to_string())
                    }
                    Err(fallback_err) => {
                        debug!("Fallback also errored: {}", fallback_err);
                        DeploymentResult::failure(e.to_string())
                    }
                }
            }
        }
    }

    fn tag_fallback(&self, result: DeploymentResult, original: &str) -> DeploymentResult {
        tag_provider(result, self.fallback.name()).with_metadata("fallbackFrom", original)
    }
}

fn tag_provider(mut result: DeploymentResult, name: &str) -> DeploymentResult {
    result
        .metadata
        .entry("provider".to_string())
        .or_insert_with(|| name.to_string());
    result
}
