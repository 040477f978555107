//! Transport-independent matchmaking logic API
//!
//! `MmLogicApi` exposes the five operations a matchmaking function can call.
//! Each call is logged and reported to the observer exactly once, as either a
//! completed request or an error.

use crate::config::AppConfig;
use crate::error::{ErrorKind, Result};
use crate::ignorelist::IgnoreListStore;
use crate::metrics::observer::{Observer, Operation};
use crate::pool::{
    AggregationSettings, FetchPolicy, FilterFetcher, PageSink, PoolAggregator, PoolStreamer,
};
use crate::profile::ProfileAccessor;
use crate::proposal::{ProposalPipeline, ProposalReport};
use crate::store::StateStore;
use crate::types::{MatchObject, PlayerPool, ProposalResult, Roster};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Map a pipeline outcome to the response returned to matchmaking functions
pub fn proposal_result(outcome: &Result<ProposalReport>) -> ProposalResult {
    match outcome {
        Ok(_) => ProposalResult::ok(),
        Err(err) => ProposalResult::failed(err),
    }
}

/// The matchmaking logic service
pub struct MmLogicApi {
    profiles: ProfileAccessor,
    aggregator: PoolAggregator,
    streamer: PoolStreamer,
    pipeline: ProposalPipeline,
    ignorelists: Arc<IgnoreListStore>,
    observer: Arc<dyn Observer>,
}

impl MmLogicApi {
    /// Wire every component from configuration over one state store
    pub fn new(store: Arc<dyn StateStore>, config: &AppConfig, observer: Arc<dyn Observer>) -> Self {
        let ignorelists = Arc::new(IgnoreListStore::new(
            store.clone(),
            config.ignore_lists.clone(),
        ));
        let aggregator = PoolAggregator::new(
            FilterFetcher::new(store.clone(), FetchPolicy::from(&config.pool)),
            ignorelists.clone(),
            observer.clone(),
            AggregationSettings::from(&config.pool),
        );
        let pipeline = ProposalPipeline::new(
            store.clone(),
            ignorelists.clone(),
            observer.clone(),
            config.proposals.clone(),
        );

        Self {
            profiles: ProfileAccessor::new(store),
            aggregator,
            streamer: PoolStreamer::new(config.pool.page_size),
            pipeline,
            ignorelists,
            observer,
        }
    }

    pub fn streamer(&self) -> &PoolStreamer {
        &self.streamer
    }

    fn observe<T>(&self, operation: Operation, started: Instant, result: &Result<T>) {
        match result {
            Ok(_) => self.observer.record_request(operation, started.elapsed()),
            Err(err) => {
                error!("{} failed: {:#}", operation, err);
                self.observer
                    .record_error(operation, ErrorKind::of(err), started.elapsed());
            }
        }
    }

    /// Read a stored profile by id
    pub async fn get_profile(&self, id: &str) -> Result<MatchObject> {
        let started = Instant::now();
        info!("Retrieving profile {}", id);

        let result = self.profiles.load(id).await;
        self.observe(Operation::GetProfile, started, &result);
        result
    }

    /// Accept a matchmaking function's proposal or error report
    pub async fn create_proposal(&self, proposal: &MatchObject) -> Result<ProposalReport> {
        let started = Instant::now();
        if proposal.is_match() {
            info!("Writing proposal {} to state storage", proposal.id);
        } else {
            info!(
                "Writing error report {} to state storage: {}",
                proposal.id, proposal.error
            );
        }

        let result = self.pipeline.submit(proposal).await;
        if let Ok(report) = &result {
            debug!(
                "Proposal {} handled: {} players ignored, enqueued={}, workers remaining={:?}",
                proposal.id, report.players_ignored, report.enqueued, report.workers_remaining
            );
        }
        self.observe(Operation::CreateProposal, started, &result);
        result
    }

    /// Resolve a pool and stream it to `sink` page by page, returning the page count
    pub async fn get_player_pool<S>(&self, pool: PlayerPool, sink: &mut S) -> Result<usize>
    where
        S: PageSink + ?Sized,
    {
        let started = Instant::now();
        info!(
            "Resolving player pool '{}' with {} filters",
            pool.name,
            pool.filters.len()
        );

        let result = match self.aggregator.resolve(pool).await {
            Ok(resolved) => self.streamer.stream(resolved, sink).await,
            Err(err) => Err(err),
        };
        self.observe(Operation::GetPlayerPool, started, &result);
        result
    }

    /// Every player on any configured ignorelist
    pub async fn get_all_ignored_players(&self) -> Result<Roster> {
        let started = Instant::now();
        info!("Retrieving and combining all ignorelists");

        let result = self
            .ignorelists
            .all_lists()
            .await
            .map(Roster::from_player_ids);
        self.observe(Operation::GetAllIgnoredPlayers, started, &result);
        result
    }

    /// Players on the proposed ignorelist
    pub async fn list_ignored_players(&self) -> Result<Roster> {
        let started = Instant::now();
        let list = &self.pipeline.config().proposed_list;
        info!("Retrieving ignorelist '{}'", list);

        let result = self
            .ignorelists
            .retrieve(list)
            .await
            .map(Roster::from_player_ids);
        self.observe(Operation::ListIgnoredPlayers, started, &result);
        result
    }
}
