//! Single-filter range fetching
//!
//! A filter is resolved against its attribute index in bounded batches. A
//! cardinality check runs first so that empty or absurdly broad filters never
//! reach the paginated fetch.

use crate::config::PoolConfig;
use crate::error::Result;
use crate::store::StateStore;
use crate::types::{Filter, PlayerId};
use std::collections::HashMap;
use std::sync::Arc;

/// How a filter evaluation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Every matching player was fetched
    Complete,
    /// Every matching player was fetched, but the filter is unusually broad
    Large { count: i64 },
    /// The range matched nobody
    NoMatchingPlayers,
    /// The range matched more players than the ceiling allows; ids are placeholders
    TooBroad { count: i64 },
}

impl FilterOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            FilterOutcome::Complete => "complete",
            FilterOutcome::Large { .. } => "large",
            FilterOutcome::NoMatchingPlayers => "no_matching_players",
            FilterOutcome::TooBroad { .. } => "too_broad",
        }
    }
}

/// Players matching one filter
#[derive(Debug, Clone, PartialEq)]
pub struct FilterResult {
    /// Matching ids in first-seen order
    pub ids: Vec<PlayerId>,
    /// Attribute value per matching id
    pub values: HashMap<PlayerId, i64>,
    pub outcome: FilterOutcome,
}

impl FilterResult {
    fn empty() -> Self {
        Self {
            ids: Vec::new(),
            values: HashMap::new(),
            outcome: FilterOutcome::NoMatchingPlayers,
        }
    }

    fn placeholders(count: i64) -> Self {
        let ids: Vec<PlayerId> = (0..count).map(|i| i.to_string()).collect();
        let values = ids.iter().map(|id| (id.clone(), 0)).collect();
        Self {
            ids,
            values,
            outcome: FilterOutcome::TooBroad { count },
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Thresholds governing a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub batch_size: usize,
    pub large_filter_threshold: i64,
    pub filter_ceiling: i64,
}

impl From<&PoolConfig> for FetchPolicy {
    fn from(config: &PoolConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            large_filter_threshold: config.large_filter_threshold,
            filter_ceiling: config.filter_ceiling,
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::from(&PoolConfig::default())
    }
}

/// Resolves one filter against the state store
pub struct FilterFetcher {
    store: Arc<dyn StateStore>,
    policy: FetchPolicy,
}

impl FilterFetcher {
    pub fn new(store: Arc<dyn StateStore>, policy: FetchPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Fetch every player whose attribute lies within the filter's range
    pub async fn fetch(&self, filter: &Filter) -> Result<FilterResult> {
        let index = filter.attribute.as_str();
        let upper = filter.upper_bound();

        let count = self.store.count_in_range(index, filter.min, upper).await?;
        if count == 0 {
            return Ok(FilterResult::empty());
        }
        if count > self.policy.filter_ceiling {
            return Ok(FilterResult::placeholders(count));
        }

        let outcome = if count >= self.policy.large_filter_threshold {
            FilterOutcome::Large { count }
        } else {
            FilterOutcome::Complete
        };

        let batch = self.policy.batch_size.max(1);
        let capacity = usize::try_from(count).unwrap_or_default();
        let mut ids = Vec::with_capacity(capacity);
        let mut values = HashMap::with_capacity(capacity);

        // Each duplicate means the index shifted under us, so the next batch
        // starts one position earlier. A full batch of nothing but duplicates
        // still moves forward. The scan ends on a short batch or one batch past
        // the pre-flight count.
        let scan_limit = capacity.saturating_add(batch);
        let mut offset = 0usize;
        while offset < scan_limit {
            let page = self
                .store
                .fetch_range(index, filter.min, upper, offset, batch)
                .await?;
            let fetched = page.len();

            let mut fresh = 0usize;
            for (id, value) in page {
                if values.insert(id.clone(), value).is_none() {
                    ids.push(id);
                    fresh += 1;
                }
            }

            if fetched < batch {
                break;
            }
            offset += if fresh == 0 { batch } else { fresh };
        }

        Ok(FilterResult {
            ids,
            values,
            outcome,
        })
    }
}
