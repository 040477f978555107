//! Observability hooks for the matchmaking logic
//!
//! Pool resolution, ignorelist handling and the proposal pipeline never log or
//! touch metrics directly. They report what happened to an [`Observer`], and
//! the observer decides how to surface it.

use crate::error::ErrorKind;
use crate::pool::FilterOutcome;
use crate::types::Stats;
use std::fmt;
use std::time::Duration;

/// Service operations exposed by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetProfile,
    CreateProposal,
    GetPlayerPool,
    GetAllIgnoredPlayers,
    ListIgnoredPlayers,
}

pub const ALL_OPERATIONS: [Operation; 5] = [
    Operation::GetProfile,
    Operation::CreateProposal,
    Operation::GetPlayerPool,
    Operation::GetAllIgnoredPlayers,
    Operation::ListIgnoredPlayers,
];

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::GetProfile => "GetProfile",
            Operation::CreateProposal => "CreateProposal",
            Operation::GetPlayerPool => "GetPlayerPool",
            Operation::GetAllIgnoredPlayers => "GetAllIgnoredPlayers",
            Operation::ListIgnoredPlayers => "ListIgnoredPlayers",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Noteworthy conditions that did not fail the request
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// A filter over the ceiling was left out of the intersection
    TooBroadFilterDisregarded {
        pool: String,
        attribute: String,
        count: i64,
    },
    /// Ignorelists could not be read; the pool was resolved without exclusions
    IgnoreListsUnavailable { pool: String, error: String },
    /// An accepted proposal carried no players
    EmptyProposalRosters { proposal_id: String },
    /// The worker counter could not be decremented and the failure was tolerated
    WorkerCounterNotDecremented { proposal_id: String, error: String },
}

impl Notice {
    pub fn label(&self) -> &'static str {
        match self {
            Notice::TooBroadFilterDisregarded { .. } => "too_broad_filter_disregarded",
            Notice::IgnoreListsUnavailable { .. } => "ignorelists_unavailable",
            Notice::EmptyProposalRosters { .. } => "empty_proposal_rosters",
            Notice::WorkerCounterNotDecremented { .. } => "worker_counter_not_decremented",
        }
    }
}

/// Receiver of observability events
pub trait Observer: Send + Sync {
    /// A request completed successfully
    fn record_request(&self, operation: Operation, elapsed: Duration);

    /// A request failed
    fn record_error(&self, operation: Operation, kind: ErrorKind, elapsed: Duration);

    /// One filter of a pool was evaluated
    fn record_filter(&self, attribute: &str, stats: &Stats, outcome: &FilterOutcome);

    /// A pool finished resolving
    fn record_pool(&self, pool: &str, stats: &Stats);

    fn record_notice(&self, notice: Notice);
}

/// Observer that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn record_request(&self, _operation: Operation, _elapsed: Duration) {}
    fn record_error(&self, _operation: Operation, _kind: ErrorKind, _elapsed: Duration) {}
    fn record_filter(&self, _attribute: &str, _stats: &Stats, _outcome: &FilterOutcome) {}
    fn record_pool(&self, _pool: &str, _stats: &Stats) {}
    fn record_notice(&self, _notice: Notice) {}
}

/// Event captured by [`MockObserver`]
#[derive(Debug, Clone, PartialEq)]
pub enum ObservedEvent {
    Request(Operation),
    Error(Operation, ErrorKind),
    Filter {
        attribute: String,
        count: i64,
        outcome: FilterOutcome,
    },
    Pool {
        name: String,
        count: i64,
    },
    Notice(Notice),
}

/// Mock observer for testing
#[derive(Debug, Default)]
pub struct MockObserver {
    events: std::sync::Mutex<Vec<ObservedEvent>>,
}

impl MockObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded events (for testing)
    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Recorded notices only
    pub fn notices(&self) -> Vec<Notice> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::Notice(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    /// Recorded filter evaluations as (attribute, outcome)
    pub fn filters(&self) -> Vec<(String, FilterOutcome)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::Filter {
                    attribute, outcome, ..
                } => Some((attribute, outcome)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ObservedEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Observer for MockObserver {
    fn record_request(&self, operation: Operation, _elapsed: Duration) {
        self.push(ObservedEvent::Request(operation));
    }

    fn record_error(&self, operation: Operation, kind: ErrorKind, _elapsed: Duration) {
        self.push(ObservedEvent::Error(operation, kind));
    }

    fn record_filter(&self, attribute: &str, stats: &Stats, outcome: &FilterOutcome) {
        self.push(ObservedEvent::Filter {
            attribute: attribute.to_string(),
            count: stats.count,
            outcome: outcome.clone(),
        });
    }

    fn record_pool(&self, pool: &str, stats: &Stats) {
        self.push(ObservedEvent::Pool {
            name: pool.to_string(),
            count: stats.count,
        });
    }

    fn record_notice(&self, notice: Notice) {
        self.push(ObservedEvent::Notice(notice));
    }
}
