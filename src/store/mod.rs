//! State storage interface
//!
//! The logic tier never talks to a concrete database directly. Everything it
//! needs from the backing store is expressed as the small set of primitives in
//! [`StateStore`]: sorted-index range queries, plain sets, atomic counters and
//! opaque keyed objects. Each primitive is a single atomic operation; there is
//! no multi-step transaction.

pub mod memory;

pub use memory::InMemoryStateStore;

use crate::error::Result;
use crate::types::PlayerId;
use async_trait::async_trait;

/// Backing-store primitives required by the matchmaking logic
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Count members of `index` whose value lies in `[min, max]` (`None` is +inf)
    async fn count_in_range(&self, index: &str, min: i64, max: Option<i64>) -> Result<i64>;

    /// Fetch up to `limit` members of `index` in `[min, max]`, skipping the
    /// first `offset`, ordered by value then id
    async fn fetch_range(
        &self,
        index: &str,
        min: i64,
        max: Option<i64>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<(PlayerId, i64)>>;

    /// Add members to a set, returning how many were not already present
    async fn set_add(&self, key: &str, members: &[PlayerId]) -> Result<usize>;

    /// Read all members of a set (empty if the set does not exist)
    async fn set_members(&self, key: &str) -> Result<Vec<PlayerId>>;

    /// Read the union of several sets
    async fn set_union(&self, keys: &[String]) -> Result<Vec<PlayerId>>;

    /// Atomically add `delta` to a counter, returning the new value
    async fn increment(&self, key: &str, delta: i64) -> Result<i64>;

    /// Atomically subtract `delta` from a counter, returning the new value
    async fn decrement(&self, key: &str, delta: i64) -> Result<i64>;

    /// Read a serialized object
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a serialized object, replacing any previous value
    async fn put(&self, key: &str, value: String) -> Result<()>;

    /// Cheap reachability probe used by health checks
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
