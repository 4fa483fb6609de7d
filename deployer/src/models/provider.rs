//! Provider catalog and deploy result models

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::deployment::Environment;

/// Hosting architecture of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchitectureType {
    Static,
    Container,
    Serverless,
}

/// Cost tier of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostTier {
    Free,
    Low,
    Medium,
    High,
}

impl fmt::Display for CostTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CostTier::Free => "free",
            CostTier::Low => "low",
            CostTier::Medium => "medium",
            CostTier::High => "high",
        };
        f.write_str(s)
    }
}

/// Static descriptor of a hosting provider, fixed at process start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Registry key, e.g. "netlify"
    pub id: String,

    /// Human-readable name
    pub name: String,

    #[serde(rename = "type")]
    pub architecture: ArchitectureType,

    pub cost_tier: CostTier,

    pub supports_environments: Vec<Environment>,

    /// Maximum build time in minutes
    pub max_build_time: u32,

    /// Lowercase framework/type keywords this provider can host
    pub frameworks: Vec<String>,
}

/// Outcome of a single provider deploy attempt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl DeploymentResult {
    /// Successful deploy serving at `url`
    pub fn success(url: impl Into<String>) -> Self {
        Self {
            success: true,
            url: Some(url.into()),
            error: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Soft failure carrying a human-readable reason
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            url: None,
            error: Some(error.into()),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Provider that produced this result, when recorded
    pub fn provider(&self) -> Option<&str> {
        self.metadata.get("provider").map(String::as_str)
    }
}
