//! Player pool resolution configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do when the ignorelists cannot be read during pool resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IgnoreListFailurePolicy {
    /// Resolve the pool without exclusions and report a notice
    #[default]
    Degrade,
    /// Fail the whole resolution
    Abort,
}

impl FromStr for IgnoreListFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "degrade" => Ok(Self::Degrade),
            "abort" => Ok(Self::Abort),
            other => Err(anyhow::anyhow!("Unknown ignorelist failure policy: {}", other)),
        }
    }
}

impl fmt::Display for IgnoreListFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Degrade => write!(f, "degrade"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

/// Pool resolution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum players per streamed page
    pub page_size: usize,
    /// Maximum players per range query
    pub batch_size: usize,
    /// Filter size at which a resolution is reported as large
    pub large_filter_threshold: i64,
    /// Filter size above which the filter is not fetched at all
    pub filter_ceiling: i64,
    /// Fail instead of disregarding filters over the ceiling
    pub fail_on_too_broad: bool,
    pub ignore_list_failure: IgnoreListFailurePolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            page_size: 10_000,
            batch_size: 10_000,
            large_filter_threshold: 100_000,
            filter_ceiling: 500_000,
            fail_on_too_broad: false,
            ignore_list_failure: IgnoreListFailurePolicy::Degrade,
        }
    }
}
