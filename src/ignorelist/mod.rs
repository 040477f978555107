//! Ignorelists
//!
//! An ignorelist is a named set of players that must not appear in resolved
//! pools, e.g. players already proposed for a match. Lists are configured up
//! front; the combined view over all of them is computed on demand and never
//! stored.

use crate::config::IgnoreListSettings;
use crate::error::{MmLogicError, Result};
use crate::pool::set_algebra;
use crate::store::StateStore;
use crate::types::PlayerId;
use std::sync::Arc;

/// Typed accessor for one configured ignorelist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreList {
    pub name: String,
    pub key: String,
}

impl From<&IgnoreListSettings> for IgnoreList {
    fn from(settings: &IgnoreListSettings) -> Self {
        Self {
            name: settings.name.clone(),
            key: settings.storage_key().to_string(),
        }
    }
}

/// All configured ignorelists over one state store
pub struct IgnoreListStore {
    store: Arc<dyn StateStore>,
    lists: Vec<IgnoreList>,
}

impl IgnoreListStore {
    pub fn new(store: Arc<dyn StateStore>, settings: Vec<IgnoreListSettings>) -> Self {
        Self {
            store,
            lists: settings.iter().map(IgnoreList::from).collect(),
        }
    }

    /// Configured lists, in read order
    pub fn lists(&self) -> &[IgnoreList] {
        &self.lists
    }

    fn list(&self, name: &str) -> Result<&IgnoreList> {
        self.lists
            .iter()
            .find(|list| list.name == name)
            .ok_or_else(|| {
                MmLogicError::UnknownIgnoreList {
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Read one list
    pub async fn retrieve(&self, name: &str) -> Result<Vec<PlayerId>> {
        let list = self.list(name)?;
        self.store.set_members(&list.key).await
    }

    /// Add players to one list, returning how many were newly added
    pub async fn append(&self, name: &str, player_ids: &[PlayerId]) -> Result<usize> {
        let list = self.list(name)?;
        self.store.set_add(&list.key, player_ids).await
    }

    /// Union of every configured list; any single read failure fails the call
    pub async fn all_lists(&self) -> Result<Vec<PlayerId>> {
        let mut ignored = Vec::new();
        for list in &self.lists {
            let members = self.store.set_members(&list.key).await?;
            ignored = set_algebra::union(&ignored, &members);
        }
        Ok(ignored)
    }
}
