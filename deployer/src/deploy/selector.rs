//! Provider decision engine

use tracing::debug;

use crate::deploy::registry::{
    ProviderRegistry, AWS_AMPLIFY, DIGITALOCEAN, LOCAL, NETLIFY, VERCEL,
};
use crate::errors::DeployError;
use crate::models::deployment::{Budget, Environment};
use crate::models::provider::{CostTier, ProviderConfig};
use crate::models::stack::{DetectedStack, ProjectType};

/// Ranking used when neither a preference nor an override applies
fn type_priority(project_type: ProjectType) -> &'static [&'static str] {
    match project_type {
        ProjectType::Static => &[LOCAL, NETLIFY, AWS_AMPLIFY, VERCEL],
        ProjectType::Spa => &[LOCAL, NETLIFY, VERCEL, AWS_AMPLIFY],
        ProjectType::Ssr => &[VERCEL, DIGITALOCEAN, AWS_AMPLIFY, LOCAL],
        ProjectType::Api => &[DIGITALOCEAN, VERCEL, LOCAL],
        ProjectType::Fullstack => &[DIGITALOCEAN, VERCEL, LOCAL],
        ProjectType::Container => &[DIGITALOCEAN, LOCAL],
    }
}

/// Framework and descriptor routes that win over the type table
fn override_target(stack: &DetectedStack) -> Option<&'static str> {
    let framework = stack.framework.to_lowercase();
    if framework.contains("next") {
        Some(VERCEL)
    } else if framework.contains("gatsby") {
        Some(NETLIFY)
    } else if stack.has_dockerfile {
        Some(DIGITALOCEAN)
    } else {
        None
    }
}

/// Picks one provider for a detected stack under request constraints.
///
/// Selection is a pure function of its inputs and the registry contents.
#[derive(Debug, Clone)]
pub struct ProviderSelector {
    registry: ProviderRegistry,
}

impl ProviderSelector {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Providers that pass every eligibility check, in registry order
    pub fn eligible(
        &self,
        stack: &DetectedStack,
        environment: Environment,
        budget: Budget,
    ) -> Vec<&ProviderConfig> {
        self.registry
            .iter()
            .filter(|p| is_eligible(p, stack, environment, budget))
            .collect()
    }

    /// Choose a provider id
    pub fn select(
        &self,
        stack: &DetectedStack,
        environment: Environment,
        budget: Budget,
        preferred: &[String],
    ) -> Result<String, DeployError> {
        let eligible: Vec<&str> = self
            .eligible(stack, environment, budget)
            .into_iter()
            .map(|p| p.id.as_str())
            .collect();
        debug!(
            "Eligible providers for {} ({}) in {}/{}: {:?}",
            stack.framework, stack.project_type, environment, budget, eligible
        );

        if eligible.is_empty() {
            return Err(DeployError::NoEligibleProvider {
                project_type: stack.project_type.to_string(),
                framework: stack.framework.clone(),
                environment: environment.to_string(),
                budget: budget.to_string(),
            });
        }

        if let Some(choice) = preferred
            .iter()
            .find(|name| eligible.contains(&name.as_str()))
        {
            debug!("Using preferred provider {}", choice);
            return Ok(choice.clone());
        }

        // An ineligible override target falls through to the type table
        if let Some(target) = override_target(stack).filter(|t| eligible.contains(t)) {
            debug!("Framework override routes to {}", target);
            return Ok(target.to_string());
        }

        if let Some(choice) = type_priority(stack.project_type)
            .iter()
            .find(|name| eligible.contains(name))
        {
            return Ok(choice.to_string());
        }

        let fallback = if eligible.contains(&LOCAL) {
            LOCAL
        } else {
            eligible[0]
        };
        Ok(fallback.to_string())
    }
}

impl Default for ProviderSelector {
    fn default() -> Self {
        Self::new(ProviderRegistry::builtin())
    }
}

fn is_eligible(
    provider: &ProviderConfig,
    stack: &DetectedStack,
    environment: Environment,
    budget: Budget,
) -> bool {
    if !provider.supports_environments.contains(&environment) {
        return false;
    }
    if budget == Budget::Free && provider.cost_tier != CostTier::Free {
        return false;
    }

    let framework = stack.framework.to_lowercase();
    let project_type = stack.project_type.as_str();
    provider.frameworks.iter().any(|keyword| {
        let keyword = keyword.to_lowercase();
        framework.contains(&keyword) || project_type.contains(&keyword) || project_type == keyword
    })
}
