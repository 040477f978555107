//! Proposal write, enqueue and worker accounting
//!
//! A matchmaking function hands back either a proposal or an error report.
//! Both are persisted. Only real proposals put their players on the proposed
//! ignorelist and join the evaluation queue. Either way the function is done,
//! so the shared worker counter goes down by one, which lets the evaluator run
//! early once every function has finished.

use crate::config::{CounterFailurePolicy, ProposalConfig};
use crate::error::Result;
use crate::ignorelist::IgnoreListStore;
use crate::metrics::observer::{Notice, Observer};
use crate::profile::ProfileAccessor;
use crate::store::StateStore;
use crate::types::MatchObject;
use std::sync::Arc;

/// What the pipeline did for one proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProposalReport {
    /// Players newly added to the proposed ignorelist
    pub players_ignored: usize,
    /// Whether the proposal joined the evaluation queue
    pub enqueued: bool,
    /// Counter value after the decrement, if it succeeded
    pub workers_remaining: Option<i64>,
}

/// Coordinates the side effects of a submitted proposal
pub struct ProposalPipeline {
    store: Arc<dyn StateStore>,
    profiles: ProfileAccessor,
    ignorelists: Arc<IgnoreListStore>,
    observer: Arc<dyn Observer>,
    config: ProposalConfig,
}

impl ProposalPipeline {
    pub fn new(
        store: Arc<dyn StateStore>,
        ignorelists: Arc<IgnoreListStore>,
        observer: Arc<dyn Observer>,
        config: ProposalConfig,
    ) -> Self {
        Self {
            profiles: ProfileAccessor::new(store.clone()),
            store,
            ignorelists,
            observer,
            config,
        }
    }

    pub fn config(&self) -> &ProposalConfig {
        &self.config
    }

    /// Persist, ignore, enqueue, then decrement. Any failure before the
    /// decrement stops the pipeline and leaves the counter untouched.
    pub async fn submit(&self, proposal: &MatchObject) -> Result<ProposalReport> {
        let mut report = ProposalReport::default();

        self.profiles.save(proposal).await?;

        if proposal.is_match() {
            let player_ids = proposal.player_ids();
            if player_ids.is_empty() {
                self.observer.record_notice(Notice::EmptyProposalRosters {
                    proposal_id: proposal.id.clone(),
                });
            } else {
                report.players_ignored = self
                    .ignorelists
                    .append(&self.config.proposed_list, &player_ids)
                    .await?;
            }

            self.store
                .set_add(&self.config.queue_name, std::slice::from_ref(&proposal.id))
                .await?;
            report.enqueued = true;
        }

        match self
            .store
            .decrement(&self.config.worker_counter_key, 1)
            .await
        {
            Ok(remaining) => report.workers_remaining = Some(remaining),
            Err(err) => match self.config.counter_failure {
                CounterFailurePolicy::Surface => return Err(err),
                CounterFailurePolicy::Tolerate => {
                    self.observer
                        .record_notice(Notice::WorkerCounterNotDecremented {
                            proposal_id: proposal.id.clone(),
                            error: err.to_string(),
                        });
                }
            },
        }

        Ok(report)
    }
}
