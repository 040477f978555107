//! mmlogic - Matchmaking logic tier
//!
//! This crate resolves attribute-range filters into pools of eligible players
//! over an indexed state store, maintains the ignorelists that keep proposed
//! players out of later pools, and coordinates the proposal lifecycle between
//! matchmaking functions and the evaluator.

pub mod api;
pub mod config;
pub mod error;
pub mod ignorelist;
pub mod metrics;
pub mod pool;
pub mod profile;
pub mod proposal;
pub mod service;
pub mod store;
pub mod types;

// Re-export commonly used types and traits
pub use error::{ErrorKind, MmLogicError, Result};
pub use types::*;

// Re-export key components
pub use api::MmLogicApi;
pub use ignorelist::IgnoreListStore;
pub use metrics::{Observer, Operation};
pub use pool::{PageSink, PoolAggregator, PoolStreamer};
pub use proposal::ProposalPipeline;
pub use store::{InMemoryStateStore, StateStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
