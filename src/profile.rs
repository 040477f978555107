//! Stored match objects (profiles and proposals)

use crate::error::{MmLogicError, Result};
use crate::store::StateStore;
use crate::types::MatchObject;
use std::sync::Arc;

/// Reads and writes match objects keyed by their id
#[derive(Clone)]
pub struct ProfileAccessor {
    store: Arc<dyn StateStore>,
}

impl ProfileAccessor {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Load a stored object; a missing or unreadable object is a storage error
    pub async fn load(&self, id: &str) -> Result<MatchObject> {
        let raw = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| MmLogicError::storage(format!("No object stored under '{}'", id)))?;

        serde_json::from_str(&raw).map_err(|err| {
            MmLogicError::storage(format!("Object '{}' is not readable: {}", id, err)).into()
        })
    }

    /// Persist an object under its id, replacing any previous version
    pub async fn save(&self, object: &MatchObject) -> Result<()> {
        let raw = serde_json::to_string(object).map_err(|err| MmLogicError::InternalError {
            message: format!("Failed to serialize '{}': {}", object.id, err),
        })?;
        self.store.put(&object.id, raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::InMemoryStateStore;
    use crate::types::Roster;

    #[tokio::test]
    async fn test_save_then_load() {
        let accessor = ProfileAccessor::new(Arc::new(InMemoryStateStore::new()));
        let profile = MatchObject {
            id: "profile-1v1".to_string(),
            properties: r#"{"mode":"1v1"}"#.to_string(),
            rosters: vec![Roster::from_player_ids(["a", "b"])],
            ..Default::default()
        };

        accessor.save(&profile).await.unwrap();
        assert_eq!(accessor.load("profile-1v1").await.unwrap(), profile);
    }

    #[tokio::test]
    async fn test_missing_and_corrupt_objects() {
        let store = Arc::new(InMemoryStateStore::new());
        store.put("broken", "{not json".to_string()).await.unwrap();
        let accessor = ProfileAccessor::new(store);

        let err = accessor.load("missing").await.unwrap_err();
        assert_eq!(ErrorKind::of(&err), ErrorKind::Storage);

        let err = accessor.load("broken").await.unwrap_err();
        assert_eq!(ErrorKind::of(&err), ErrorKind::Storage);
    }
}
