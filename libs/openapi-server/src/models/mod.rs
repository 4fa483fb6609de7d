//! Deployify API models
//!
//! Enumerated values (status, environment, budget, project type) travel as
//! their lowercase string forms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /deployments`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeploymentRequest {
    pub repo_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// `school`, `staging` or `prod`
    pub environment: String,

    /// `free`, `low` or `any`
    pub budget: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefer_providers: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentCreatedResponse {
    pub deployment_id: String,
}

/// Status view of a deployment record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatusResponse {
    pub id: String,
    pub repo_url: String,
    pub branch: String,
    pub environment: String,
    pub budget: String,
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Detected stack, as stored on the record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_duration: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntryResponse {
    pub level: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsResponse {
    pub deployment_id: String,
    pub status: String,
    pub logs: Vec<LogEntryResponse>,
}

/// Catalog entry of `GET /providers`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub architecture: String,
    pub cost_tier: String,
    pub supported_environments: Vec<String>,
    /// Minutes
    pub max_build_time: u32,
    pub frameworks: Vec<String>,
    /// Whether a deploy variant is registered for this provider
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersResponse {
    pub providers: Vec<ProviderInfo>,
}

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
    pub target: String,
}

/// Metrics response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub uptime_secs: u64,
    pub system_uptime_secs: u64,
    pub memory_used: u64,
    pub memory_total: u64,
    pub memory_percent: f32,
    pub disk_used: u64,
    pub disk_total: u64,
    pub disk_percent: f32,
    pub hostname: String,
    pub timestamp: DateTime<Utc>,
}

/// Error body of every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
