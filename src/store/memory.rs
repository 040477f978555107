//! In-memory state store
//!
//! Process-local implementation of [`StateStore`]. Sorted indexes keep Redis
//! ordering semantics (value first, member second) so range pagination behaves
//! the same way it would against a real sorted-set backend.

use crate::error::{MmLogicError, Result};
use crate::store::StateStore;
use crate::types::PlayerId;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

/// One attribute index: members ordered by value
#[derive(Debug, Default)]
struct SortedIndex {
    by_value: BTreeSet<(i64, PlayerId)>,
    values: HashMap<PlayerId, i64>,
}

impl SortedIndex {
    fn insert(&mut self, member: PlayerId, value: i64) {
        if let Some(previous) = self.values.insert(member.clone(), value) {
            self.by_value.remove(&(previous, member.clone()));
        }
        self.by_value.insert((value, member));
    }

    fn remove(&mut self, member: &str) -> bool {
        match self.values.remove(member) {
            Some(previous) => self.by_value.remove(&(previous, member.to_string())),
            None => false,
        }
    }

    fn range(&self, min: i64, max: Option<i64>) -> impl Iterator<Item = &(i64, PlayerId)> + '_ {
        self.by_value
            .range((min, String::new())..)
            .take_while(move |(value, _)| max.map_or(true, |max| *value <= max))
    }
}

/// In-memory storage backend
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    indexes: RwLock<HashMap<String, SortedIndex>>,
    sets: RwLock<HashMap<String, BTreeSet<PlayerId>>>,
    counters: RwLock<HashMap<String, i64>>,
    objects: RwLock<HashMap<String, String>>,
}

fn lock_error(what: &str) -> anyhow::Error {
    MmLogicError::storage(format!("Failed to acquire {} lock", what)).into()
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or move a player within an attribute index
    pub fn index_player(&self, index: &str, player_id: &str, value: i64) -> Result<()> {
        let mut indexes = self.indexes.write().map_err(|_| lock_error("index write"))?;
        indexes
            .entry(index.to_string())
            .or_default()
            .insert(player_id.to_string(), value);
        Ok(())
    }

    /// Remove a player from an attribute index, returning whether it was present
    pub fn deindex_player(&self, index: &str, player_id: &str) -> Result<bool> {
        let mut indexes = self.indexes.write().map_err(|_| lock_error("index write"))?;
        Ok(indexes
            .get_mut(index)
            .map(|idx| idx.remove(player_id))
            .unwrap_or(false))
    }

    /// Number of members in an attribute index
    pub fn index_len(&self, index: &str) -> Result<usize> {
        let indexes = self.indexes.read().map_err(|_| lock_error("index read"))?;
        Ok(indexes.get(index).map(|idx| idx.values.len()).unwrap_or(0))
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn count_in_range(&self, index: &str, min: i64, max: Option<i64>) -> Result<i64> {
        let indexes = self.indexes.read().map_err(|_| lock_error("index read"))?;
        Ok(indexes
            .get(index)
            .map(|idx| idx.range(min, max).count() as i64)
            .unwrap_or(0))
    }

    async fn fetch_range(
        &self,
        index: &str,
        min: i64,
        max: Option<i64>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<(PlayerId, i64)>> {
        let indexes = self.indexes.read().map_err(|_| lock_error("index read"))?;
        Ok(indexes
            .get(index)
            .map(|idx| {
                idx.range(min, max)
                    .skip(offset)
                    .take(limit)
                    .map(|(value, member)| (member.clone(), *value))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set_add(&self, key: &str, members: &[PlayerId]) -> Result<usize> {
        let mut sets = self.sets.write().map_err(|_| lock_error("set write"))?;
        let set = sets.entry(key.to_string()).or_default();
        Ok(members
            .iter()
            .filter(|member| set.insert((*member).clone()))
            .count())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<PlayerId>> {
        let sets = self.sets.read().map_err(|_| lock_error("set read"))?;
        Ok(sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn set_union(&self, keys: &[String]) -> Result<Vec<PlayerId>> {
        let sets = self.sets.read().map_err(|_| lock_error("set read"))?;
        let union: BTreeSet<&PlayerId> = keys
            .iter()
            .filter_map(|key| sets.get(key))
            .flat_map(|set| set.iter())
            .collect();
        Ok(union.into_iter().cloned().collect())
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        let mut counters = self.counters.write().map_err(|_| lock_error("counter write"))?;
        let counter = counters.entry(key.to_string()).or_insert(0);
        *counter += delta;
        Ok(*counter)
    }

    async fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        self.increment(key, -delta).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let objects = self.objects.read().map_err(|_| lock_error("object read"))?;
        Ok(objects.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        let mut objects = self.objects.write().map_err(|_| lock_error("object write"))?;
        objects.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store() -> InMemoryStateStore {
        let store = InMemoryStateStore::new();
        for (id, value) in [("p1", 5), ("p2", 10), ("p3", 15), ("p4", 10)] {
            store.index_player("mmr", id, value).unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_count_and_fetch_range() {
        let store = seeded_store();

        assert_eq!(store.count_in_range("mmr", 8, None).await.unwrap(), 3);
        assert_eq!(store.count_in_range("mmr", 0, Some(10)).await.unwrap(), 3);
        assert_eq!(store.count_in_range("missing", 0, None).await.unwrap(), 0);

        let all = store.fetch_range("mmr", 0, None, 0, 10).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|(id, _)| id.as_str()).collect();
        // Ties on value are broken by member id
        assert_eq!(ids, vec!["p1", "p2", "p4", "p3"]);

        let page = store.fetch_range("mmr", 0, None, 1, 2).await.unwrap();
        assert_eq!(page, vec![("p2".to_string(), 10), ("p4".to_string(), 10)]);
    }

    #[tokio::test]
    async fn test_reindexing_moves_player() {
        let store = seeded_store();
        store.index_player("mmr", "p1", 20).unwrap();

        assert_eq!(store.index_len("mmr").unwrap(), 4);
        assert_eq!(store.count_in_range("mmr", 0, Some(5)).await.unwrap(), 0);
        assert_eq!(store.count_in_range("mmr", 16, None).await.unwrap(), 1);

        assert!(store.deindex_player("mmr", "p1").unwrap());
        assert!(!store.deindex_player("mmr", "p1").unwrap());
        assert_eq!(store.index_len("mmr").unwrap(), 3);
    }

    #[tokio::test]
    async fn test_sets_are_idempotent() {
        let store = InMemoryStateStore::new();
        let members = vec!["a".to_string(), "b".to_string()];

        assert_eq!(store.set_add("proposed", &members).await.unwrap(), 2);
        assert_eq!(store.set_add("proposed", &members).await.unwrap(), 0);
        assert_eq!(store.set_members("proposed").await.unwrap(), members);

        store
            .set_add("deindexed", &["b".to_string(), "c".to_string()])
            .await
            .unwrap();
        let union = store
            .set_union(&["proposed".to_string(), "deindexed".to_string()])
            .await
            .unwrap();
        assert_eq!(union, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_counters_and_objects() {
        let store = InMemoryStateStore::new();

        assert_eq!(store.increment("concurrentMMFs", 3).await.unwrap(), 3);
        assert_eq!(store.decrement("concurrentMMFs", 1).await.unwrap(), 2);
        assert_eq!(store.increment("concurrentMMFs", 0).await.unwrap(), 2);

        assert!(store.get("profile-1").await.unwrap().is_none());
        store
            .put("profile-1", r#"{"id":"profile-1"}"#.to_string())
            .await
            .unwrap();
        assert_eq!(
            store.get("profile-1").await.unwrap().as_deref(),
            Some(r#"{"id":"profile-1"}"#)
        );
    }

    #[test]
    fn test_ping_without_runtime() {
        let store = InMemoryStateStore::new();
        tokio_test::assert_ok!(tokio_test::block_on(store.ping()));
        assert_eq!(
            tokio_test::block_on(store.decrement("unset", 1)).unwrap(),
            -1
        );
    }
}
