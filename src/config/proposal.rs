//! Proposal pipeline configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do when the worker counter cannot be decremented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterFailurePolicy {
    /// Return the error to the caller
    #[default]
    Surface,
    /// Report a notice and treat the proposal as accepted
    Tolerate,
}

impl FromStr for CounterFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "surface" => Ok(Self::Surface),
            "tolerate" => Ok(Self::Tolerate),
            other => Err(anyhow::anyhow!("Unknown counter failure policy: {}", other)),
        }
    }
}

impl fmt::Display for CounterFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surface => write!(f, "surface"),
            Self::Tolerate => write!(f, "tolerate"),
        }
    }
}

/// Proposal pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalConfig {
    /// Set that the evaluator reads proposal ids from
    pub queue_name: String,
    /// Counter of matchmaking functions still running
    pub worker_counter_key: String,
    /// Ignorelist that receives players from accepted proposals
    pub proposed_list: String,
    pub counter_failure: CounterFailurePolicy,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            queue_name: "proposalq".to_string(),
            worker_counter_key: "concurrentMMFs".to_string(),
            proposed_list: "proposed".to_string(),
            counter_failure: CounterFailurePolicy::Surface,
        }
    }
}
