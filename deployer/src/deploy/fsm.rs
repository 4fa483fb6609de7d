//! Status graph of a deployment job
//!
//! queued -> cloning -> detecting -> building -> deploying -> success, with
//! failed and cancelled reachable from every non-terminal status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DeployError;

/// Deployment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    /// Accepted, waiting for a worker
    Queued,

    /// Shallow clone in progress
    Cloning,

    /// Stack detection and provider selection
    Detecting,

    /// Installing dependencies and building
    Building,

    /// Uploading the artifact to the provider
    Deploying,

    /// Live
    Success,

    Failed,

    Cancelled,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Queued => "queued",
            DeploymentStatus::Cloning => "cloning",
            DeploymentStatus::Detecting => "detecting",
            DeploymentStatus::Building => "building",
            DeploymentStatus::Deploying => "deploying",
            DeploymentStatus::Success => "success",
            DeploymentStatus::Failed => "failed",
            DeploymentStatus::Cancelled => "cancelled",
        }
    }

    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentStatus::Success | DeploymentStatus::Failed | DeploymentStatus::Cancelled
        )
    }

    /// The next status on the forward path, if any
    pub fn next(&self) -> Option<DeploymentStatus> {
        match self {
            DeploymentStatus::Queued => Some(DeploymentStatus::Cloning),
            DeploymentStatus::Cloning => Some(DeploymentStatus::Detecting),
            DeploymentStatus::Detecting => Some(DeploymentStatus::Building),
            DeploymentStatus::Building => Some(DeploymentStatus::Deploying),
            DeploymentStatus::Deploying => Some(DeploymentStatus::Success),
            _ => None,
        }
    }

    /// Check whether `to` is reachable from this status in one step.
    ///
    /// Staying on the same non-terminal status is allowed so partial field
    /// updates can be recorded without moving the job forward.
    pub fn can_transition_to(&self, to: DeploymentStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match to {
            DeploymentStatus::Failed | DeploymentStatus::Cancelled => true,
            to if to == *self => true,
            to => self.next() == Some(to),
        }
    }

    /// Validate a transition, returning the new status
    pub fn transition(&self, to: DeploymentStatus) -> Result<DeploymentStatus, DeployError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(DeployError::InvalidTransition {
                from: self.to_string(),
                to: to.to_string(),
            })
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(DeploymentStatus::Queued),
            "cloning" => Ok(DeploymentStatus::Cloning),
            "detecting" => Ok(DeploymentStatus::Detecting),
            "building" => Ok(DeploymentStatus::Building),
            "deploying" => Ok(DeploymentStatus::Deploying),
            "success" => Ok(DeploymentStatus::Success),
            "failed" => Ok(DeploymentStatus::Failed),
            "cancelled" => Ok(DeploymentStatus::Cancelled),
            _ => Err(format!("Invalid deployment status: {}", s)),
        }
    }
}
