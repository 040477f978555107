//! Test fixtures and store wrappers for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use mmlogic::config::AppConfig;
use mmlogic::error::{MmLogicError, Result};
use mmlogic::metrics::observer::MockObserver;
use mmlogic::{InMemoryStateStore, MmLogicApi, PlayerId, StateStore};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Store primitives that [`FlakyStore`] can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    CountInRange,
    FetchRange,
    SetAdd,
    SetMembers,
    SetUnion,
    Increment,
    Decrement,
    Get,
    Put,
}

/// In-memory store that fails chosen primitives and counts every call
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: InMemoryStateStore,
    failing: Mutex<HashSet<StoreOp>>,
    calls: Mutex<Vec<StoreOp>>,
    decrements: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future call to `op` fail with a storage error
    pub fn fail(&self, op: StoreOp) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(op);
        }
    }

    pub fn heal(&self, op: StoreOp) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.remove(&op);
        }
    }

    /// Underlying store, for seeding and inspection
    pub fn inner(&self) -> &InMemoryStateStore {
        &self.inner
    }

    /// Every primitive called so far, in order
    pub fn calls(&self) -> Vec<StoreOp> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Number of decrement calls that reached the store
    pub fn decrement_count(&self) -> usize {
        self.decrements.load(Ordering::SeqCst)
    }

    fn enter(&self, op: StoreOp) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(op);
        }
        let failing = self
            .failing
            .lock()
            .map(|failing| failing.contains(&op))
            .unwrap_or(false);
        if failing {
            return Err(MmLogicError::storage(format!("injected failure in {:?}", op)).into());
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for FlakyStore {
    async fn count_in_range(&self, index: &str, min: i64, max: Option<i64>) -> Result<i64> {
        self.enter(StoreOp::CountInRange)?;
        self.inner.count_in_range(index, min, max).await
    }

    async fn fetch_range(
        &self,
        index: &str,
        min: i64,
        max: Option<i64>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<(PlayerId, i64)>> {
        self.enter(StoreOp::FetchRange)?;
        self.inner.fetch_range(index, min, max, offset, limit).await
    }

    async fn set_add(&self, key: &str, members: &[PlayerId]) -> Result<usize> {
        self.enter(StoreOp::SetAdd)?;
        self.inner.set_add(key, members).await
    }

    async fn set_members(&self, key: &str) -> Result<Vec<PlayerId>> {
        self.enter(StoreOp::SetMembers)?;
        self.inner.set_members(key).await
    }

    async fn set_union(&self, keys: &[String]) -> Result<Vec<PlayerId>> {
        self.enter(StoreOp::SetUnion)?;
        self.inner.set_union(keys).await
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        self.enter(StoreOp::Increment)?;
        self.inner.increment(key, delta).await
    }

    async fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        self.enter(StoreOp::Decrement)?;
        self.decrements.fetch_add(1, Ordering::SeqCst);
        self.inner.decrement(key, delta).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.enter(StoreOp::Get)?;
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        self.enter(StoreOp::Put)?;
        self.inner.put(key, value).await
    }
}

/// Index every `(id, value)` pair under `index`
pub fn seed_index(store: &InMemoryStateStore, index: &str, players: &[(&str, i64)]) {
    for (id, value) in players {
        store
            .index_player(index, id, *value)
            .expect("Failed to seed index");
    }
}

/// Index `count` players named `p0000..` with `value(i)` under `index`
pub fn seed_range(store: &InMemoryStateStore, index: &str, count: usize, value: impl Fn(usize) -> i64) {
    for i in 0..count {
        store
            .index_player(index, &format!("p{:04}", i), value(i))
            .expect("Failed to seed index");
    }
}

/// Config with small pages so pagination is visible in tests
pub fn test_config(page_size: usize) -> AppConfig {
    let mut config = AppConfig::default();
    config.pool.page_size = page_size;
    config.pool.batch_size = 4;
    config
}

/// API over `store` with an observer the test can inspect
pub fn build_api(
    store: Arc<dyn StateStore>,
    config: &AppConfig,
) -> (MmLogicApi, Arc<MockObserver>) {
    let observer = Arc::new(MockObserver::new());
    let api = MmLogicApi::new(store, config, observer.clone());
    (api, observer)
}
