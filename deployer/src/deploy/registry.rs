//! Static provider catalog

use crate::models::deployment::Environment;
use crate::models::provider::{ArchitectureType, CostTier, ProviderConfig};

pub const LOCAL: &str = "local";
pub const NETLIFY: &str = "netlify";
pub const VERCEL: &str = "vercel";
pub const DIGITALOCEAN: &str = "digitalocean";
pub const AWS_AMPLIFY: &str = "aws-amplify";

const ALL_ENVIRONMENTS: &[Environment] =
    &[Environment::School, Environment::Staging, Environment::Prod];
const PAID_ENVIRONMENTS: &[Environment] = &[Environment::Staging, Environment::Prod];

/// Ordered, read-only set of provider descriptors.
///
/// Iteration order is the registration order and is what "first eligible
/// provider" refers to during selection.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<ProviderConfig>,
}

impl ProviderRegistry {
    /// Registry with an explicit catalog
    pub fn new(providers: Vec<ProviderConfig>) -> Self {
        Self { providers }
    }

    /// The built-in catalog
    pub fn builtin() -> Self {
        Self::new(vec![
            descriptor(
                LOCAL,
                "Local Static Hosting",
                ArchitectureType::Static,
                CostTier::Free,
                ALL_ENVIRONMENTS,
                5,
                &["static", "spa", "gatsby", "react", "vue", "angular", "svelte", "html"],
            ),
            descriptor(
                NETLIFY,
                "Netlify",
                ArchitectureType::Static,
                CostTier::Free,
                ALL_ENVIRONMENTS,
                15,
                &["static", "spa", "gatsby", "react", "vue", "angular", "svelte"],
            ),
            descriptor(
                VERCEL,
                "Vercel",
                ArchitectureType::Serverless,
                CostTier::Free,
                ALL_ENVIRONMENTS,
                20,
                &["next.js", "react", "vue", "angular", "static", "spa"],
            ),
            descriptor(
                DIGITALOCEAN,
                "DigitalOcean App Platform",
                ArchitectureType::Container,
                CostTier::Low,
                PAID_ENVIRONMENTS,
                30,
                &["api", "fullstack", "container", "node.js", "python", "docker"],
            ),
            descriptor(
                AWS_AMPLIFY,
                "AWS Amplify",
                ArchitectureType::Static,
                CostTier::Low,
                PAID_ENVIRONMENTS,
                25,
                &["react", "vue", "angular", "static", "spa"],
            ),
        ])
    }

    pub fn get(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn descriptor(
    id: &str,
    name: &str,
    architecture: ArchitectureType,
    cost_tier: CostTier,
    environments: &[Environment],
    max_build_time: u32,
    frameworks: &[&str],
) -> ProviderConfig {
    ProviderConfig {
        id: id.to_string(),
        name: name.to_string(),
        architecture,
        cost_tier,
        supports_environments: environments.to_vec(),
        max_build_time,
        frameworks: frameworks.iter().map(|f| f.to_string()).collect(),
    }
}
