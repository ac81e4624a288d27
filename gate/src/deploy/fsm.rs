//! Finite state machine for deployment records

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::GateError;

/// Deployment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Validated and staged, awaiting review
    Pending,

    /// Applied to the target tree
    Deployed,

    /// Refused by a reviewer
    Rejected,

    /// Deployed, then reverted
    RolledBack,

    /// Staging or apply failed
    Failed,
}

impl DeploymentStatus {
    pub const ALL: [DeploymentStatus; 5] = [
        DeploymentStatus::Pending,
        DeploymentStatus::Deployed,
        DeploymentStatus::Rejected,
        DeploymentStatus::RolledBack,
        DeploymentStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStatus::Pending => "pending",
            DeploymentStatus::Deployed => "deployed",
            DeploymentStatus::Rejected => "rejected",
            DeploymentStatus::RolledBack => "rolled_back",
            DeploymentStatus::Failed => "failed",
        }
    }

    /// Whether the graph has an edge from `self` to `next`
    pub fn can_transition_to(&self, next: DeploymentStatus) -> bool {
        use DeploymentStatus::*;
        matches!(
            (self, next),
            (Pending, Deployed) | (Pending, Rejected) | (Pending, Failed) | (Deployed, RolledBack)
        )
    }

    /// Statuses reachable in one step
    pub fn next_states(&self) -> Vec<DeploymentStatus> {
        Self::ALL
            .into_iter()
            .filter(|next| self.can_transition_to(*next))
            .collect()
    }

    pub fn is_terminal(&self) -> bool {
        self.next_states().is_empty()
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
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown deployment status: {}", s))
    }
}

/// Refuse any move outside the transition graph
pub fn check_transition(
    current: DeploymentStatus,
    requested: DeploymentStatus,
) -> Result<(), GateError> {
    if current.can_transition_to(requested) {
        Ok(())
    } else {
        Err(GateError::State { current, requested })
    }
}
