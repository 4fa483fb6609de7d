//! Deployment models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::deploy::fsm::DeploymentStatus;
use crate::models::stack::DetectedStack;

/// Target environment of a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    School,
    Staging,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::School => "school",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "school" => Ok(Environment::School),
            "staging" => Ok(Environment::Staging),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

/// Budget constraint of a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Budget {
    Free,
    Low,
    Any,
}

impl Budget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Budget::Free => "free",
            Budget::Low => "low",
            Budget::Any => "any",
        }
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Budget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Budget::Free),
            "low" => Ok(Budget::Low),
            "any" => Ok(Budget::Any),
            _ => Err(format!("Invalid budget: {}", s)),
        }
    }
}

fn default_branch() -> String {
    "main".to_string()
}

/// A deployment request, immutable once accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    pub repo_url: String,

    #[serde(default = "default_branch")]
    pub branch: String,

    pub environment: Environment,

    pub budget: Budget,

    /// Provider names in order of preference
    #[serde(default)]
    pub prefer_providers: Vec<String>,
}

impl DeploymentRequest {
    pub fn new(repo_url: impl Into<String>, environment: Environment, budget: Budget) -> Self {
        Self {
            repo_url: repo_url.into(),
            branch: default_branch(),
            environment,
            budget,
            prefer_providers: Vec::new(),
        }
    }
}

/// Level of a job log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// A log entry appended to a deployment record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Persisted deployment entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub id: String,

    pub repo_url: String,
    pub branch: String,
    pub environment: Environment,
    pub budget: Budget,
    #[serde(default)]
    pub prefer_providers: Vec<String>,

    pub status: DeploymentStatus,

    #[serde(default)]
    pub provider: Option<String>,

    #[serde(default)]
    pub deployment_url: Option<String>,

    #[serde(default)]
    pub detected_stack: Option<DetectedStack>,

    #[serde(default)]
    pub logs: Vec<LogEntry>,

    #[serde(default)]
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,

    /// Seconds from start to completion
    #[serde(default)]
    pub build_duration: Option<i64>,
}

impl DeploymentRecord {
    /// Create a queued record for an accepted request
    pub fn new(id: String, request: &DeploymentRequest) -> Self {
        let now = Utc::now();
        Self {
            id,
            repo_url: request.repo_url.clone(),
            branch: request.branch.clone(),
            environment: request.environment,
            budget: request.budget,
            prefer_providers: request.prefer_providers.clone(),
            status: DeploymentStatus::Queued,
            provider: None,
            deployment_url: None,
            detected_stack: None,
            logs: Vec::new(),
            error_message: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            build_duration: None,
        }
    }

    /// Rebuild the request this record was created from
    pub fn request(&self) -> DeploymentRequest {
        DeploymentRequest {
            repo_url: self.repo_url.clone(),
            branch: self.branch.clone(),
            environment: self.environment,
            budget: self.budget,
            prefer_providers: self.prefer_providers.clone(),
        }
    }
}

/// Partial field update applied together with a status change
#[derive(Debug, Clone, Default)]
pub struct RecordUpdate {
    pub provider: Option<String>,
    pub deployment_url: Option<String>,
    pub detected_stack: Option<DetectedStack>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub build_duration: Option<i64>,
}

impl RecordUpdate {
    /// Merge the set fields into `record`; unset fields are left untouched
    pub fn apply(self, record: &mut DeploymentRecord) {
        if let Some(provider) = self.provider {
            record.provider = Some(provider);
        }
        if let Some(url) = self.deployment_url {
            record.deployment_url = Some(url);
        }
        if let Some(stack) = self.detected_stack {
            record.detected_stack = Some(stack);
        }
        if let Some(error) = self.error_message {
            record.error_message = Some(error);
        }
        if let Some(started_at) = self.started_at {
            record.started_at = Some(started_at);
        }
        if let Some(completed_at) = self.completed_at {
            record.completed_at = Some(completed_at);
        }
        if let Some(duration) = self.build_duration {
            record.build_duration = Some(duration);
        }
    }
}
