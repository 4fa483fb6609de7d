//! Domain models

pub mod deployment;
pub mod provider;
pub mod stack;

pub use crate::deploy::fsm::DeploymentStatus;
pub use deployment::{
    Budget, DeploymentRecord, DeploymentRequest, Environment, LogEntry, LogLevel, RecordUpdate,
};
pub use provider::{ArchitectureType, CostTier, DeploymentResult, ProviderConfig};
pub use stack::{DetectedStack, PackageManager, ProjectType};
