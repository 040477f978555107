//! Player pool resolution
//!
//! This module contains the pieces that turn a pool request (a list of
//! attribute-range filters) into a roster of eligible players:
//! - Range fetching for individual filters
//! - Intersection across filters and ignorelist exclusion
//! - Paged delivery of the resulting roster

pub mod aggregator;
pub mod fetcher;
pub mod set_algebra;
pub mod streamer;

pub use aggregator::{AggregationSettings, PoolAggregator};
pub use fetcher::{FetchPolicy, FilterFetcher, FilterOutcome, FilterResult};
pub use streamer::{CollectingSink, PageSink, PoolStreamer};
