//! Multi-filter pool resolution
//!
//! Filters are evaluated one after another, their results intersected, and
//! every ignored player removed. Per-filter and per-pool statistics are written
//! back onto the pool so callers can see how each stage performed.

use super::fetcher::{FilterFetcher, FilterOutcome, FilterResult};
use super::set_algebra;
use crate::config::{IgnoreListFailurePolicy, PoolConfig};
use crate::error::{MmLogicError, Result};
use crate::ignorelist::IgnoreListStore;
use crate::metrics::observer::{Notice, Observer};
use crate::types::{Player, PlayerPool, Roster, Stats};
use std::sync::Arc;
use std::time::Instant;

/// Aggregation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregationSettings {
    pub fail_on_too_broad: bool,
    pub ignore_list_failure: IgnoreListFailurePolicy,
}

impl From<&PoolConfig> for AggregationSettings {
    fn from(config: &PoolConfig) -> Self {
        Self {
            fail_on_too_broad: config.fail_on_too_broad,
            ignore_list_failure: config.ignore_list_failure,
        }
    }
}

/// Resolves player pools from their filters
pub struct PoolAggregator {
    fetcher: FilterFetcher,
    ignorelists: Arc<IgnoreListStore>,
    observer: Arc<dyn Observer>,
    settings: AggregationSettings,
}

impl PoolAggregator {
    pub fn new(
        fetcher: FilterFetcher,
        ignorelists: Arc<IgnoreListStore>,
        observer: Arc<dyn Observer>,
        settings: AggregationSettings,
    ) -> Self {
        Self {
            fetcher,
            ignorelists,
            observer,
            settings,
        }
    }

    /// Resolve the pool's roster, filling in filter and pool stats
    pub async fn resolve(&self, mut pool: PlayerPool) -> Result<PlayerPool> {
        let started = Instant::now();
        // (attribute, result) for every filter that takes part in the intersection
        let mut considered: Vec<(String, FilterResult)> = Vec::with_capacity(pool.filters.len());

        for filter in pool.filters.iter_mut() {
            let filter_started = Instant::now();
            let result = self.fetcher.fetch(filter).await?;
            let stats = Stats {
                count: result.len() as i64,
                elapsed: filter_started.elapsed().as_secs_f64(),
            };
            filter.stats = Some(stats);
            self.observer
                .record_filter(&filter.attribute, &stats, &result.outcome);

            match result.outcome {
                FilterOutcome::NoMatchingPlayers => {
                    return Ok(self.finish(pool, Vec::new(), started));
                }
                FilterOutcome::TooBroad { count } => {
                    if self.settings.fail_on_too_broad {
                        return Err(MmLogicError::FilterTooBroad {
                            attribute: filter.attribute.clone(),
                            count,
                            ceiling: self.fetcher.policy().filter_ceiling,
                        }
                        .into());
                    }
                    self.observer.record_notice(Notice::TooBroadFilterDisregarded {
                        pool: pool.name.clone(),
                        attribute: filter.attribute.clone(),
                        count,
                    });
                }
                FilterOutcome::Complete | FilterOutcome::Large { .. } => {
                    considered.push((filter.attribute.clone(), result));
                }
            }
        }

        let id_sets: Vec<&[String]> = considered
            .iter()
            .map(|(_, result)| result.ids.as_slice())
            .collect();
        let overlap = set_algebra::intersect_all(&id_sets);

        let ignored = match self.ignorelists.all_lists().await {
            Ok(ignored) => ignored,
            Err(err) => match self.settings.ignore_list_failure {
                IgnoreListFailurePolicy::Abort => return Err(err),
                IgnoreListFailurePolicy::Degrade => {
                    self.observer.record_notice(Notice::IgnoreListsUnavailable {
                        pool: pool.name.clone(),
                        error: err.to_string(),
                    });
                    Vec::new()
                }
            },
        };

        let players = set_algebra::difference(&overlap, &ignored)
            .into_iter()
            .map(|id| {
                let mut player = Player::with_id(id);
                for (attribute, result) in &considered {
                    if let Some(value) = result.values.get(&player.id) {
                        player.attributes.insert(attribute.clone(), *value);
                    }
                }
                player
            })
            .collect();

        Ok(self.finish(pool, players, started))
    }

    fn finish(&self, mut pool: PlayerPool, players: Vec<Player>, started: Instant) -> PlayerPool {
        let stats = Stats {
            count: players.len() as i64,
            elapsed: started.elapsed().as_secs_f64(),
        };
        pool.roster = Some(Roster {
            name: pool.name.clone(),
            players,
        });
        pool.stats = Some(stats);
        self.observer.record_pool(&pool.name, &stats);
        pool
    }
}
