//! Error types for the deployment daemon

use thiserror::Error;

/// Main error type for deployify
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Repository unreachable, branch missing, or the clone could not write the workspace
    #[error("Clone failed: {0}")]
    CloneFailure(String),

    /// Dependency install or build command failed, or no build output was found
    #[error("Build failed: {0}")]
    BuildFailure(String),

    #[error(
        "No eligible provider for {framework} ({project_type}) in environment '{environment}' with budget '{budget}'"
    )]
    NoEligibleProvider {
        project_type: String,
        framework: String,
        environment: String,
        budget: String,
    },

    /// The selected provider failed and the local fallback could not rescue it
    #[error("Provider deployment failed: {0}")]
    ProviderDeployFailure(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for DeployError {
    fn from(err: anyhow::Error) -> Self {
        DeployError::Internal(err.to_string())
    }
}
