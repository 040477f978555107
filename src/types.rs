//! Common types used throughout the matchmaking logic service

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique identifier for players
pub type PlayerId = String;

/// Execution statistics attached to filters and pools after resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Number of players in the result
    pub count: i64,
    /// Wall time spent producing the result, in seconds
    pub elapsed: f64,
}

/// Range predicate over one indexed player attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Optional human-readable label
    #[serde(default)]
    pub name: String,
    /// Name of the attribute index to query
    pub attribute: String,
    /// Inclusive lower bound
    #[serde(default)]
    pub min: i64,
    /// Inclusive upper bound; 0 means unbounded
    #[serde(default)]
    pub max: i64,
    /// Populated once the filter has been evaluated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Stats>,
}

impl Filter {
    pub fn new(attribute: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: String::new(),
            attribute: attribute.into(),
            min,
            max,
            stats: None,
        }
    }

    /// Effective upper bound for range queries (`None` is +inf)
    pub fn upper_bound(&self) -> Option<i64> {
        if self.max == 0 {
            None
        } else {
            Some(self.max)
        }
    }
}

/// A player as returned in rosters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, i64>,
}

impl Player {
    /// Player carrying only an identifier
    pub fn with_id(id: impl Into<PlayerId>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }
}

/// Named, ordered group of players
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub players: Vec<Player>,
}

impl Roster {
    /// Build an id-only roster
    pub fn from_player_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PlayerId>,
    {
        Self {
            name: String::new(),
            players: ids.into_iter().map(Player::with_id).collect(),
        }
    }

    /// Identifiers of every player on the roster, in roster order
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id.clone()).collect()
    }
}

/// Pool request and, after resolution, its result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerPool {
    pub name: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roster: Option<Roster>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Stats>,
}

impl PlayerPool {
    pub fn new(name: impl Into<String>, filters: Vec<Filter>) -> Self {
        Self {
            name: name.into(),
            filters,
            roster: None,
            stats: None,
        }
    }

    /// Players on the resolved roster (empty before resolution)
    pub fn players(&self) -> &[Player] {
        self.roster
            .as_ref()
            .map(|r| r.players.as_slice())
            .unwrap_or(&[])
    }
}

/// Stored object shared by profiles and proposals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchObject {
    pub id: String,
    /// Opaque JSON document supplied by the caller
    #[serde(default)]
    pub properties: String,
    #[serde(default)]
    pub rosters: Vec<Roster>,
    #[serde(default)]
    pub pools: Vec<PlayerPool>,
    /// Non-empty when the matchmaking function reported a failure
    #[serde(default)]
    pub error: String,
}

impl MatchObject {
    /// True when the producing function reported a match rather than an error
    pub fn is_match(&self) -> bool {
        self.error.is_empty()
    }

    /// Every player id across all rosters, in roster order
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.rosters.iter().flat_map(Roster::player_ids).collect()
    }
}

/// Response to a proposal submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposalResult {
    pub success: bool,
    #[serde(default)]
    pub error: String,
}

impl ProposalResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: String::new(),
        }
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_max_is_unbounded() {
        assert_eq!(Filter::new("mmr", 8, 0).upper_bound(), None);
        assert_eq!(Filter::new("mmr", 8, 20).upper_bound(), Some(20));
    }

    #[test]
    fn test_match_object_player_ids() {
        let proposal = MatchObject {
            id: "proposal-1".to_string(),
            rosters: vec![
                Roster::from_player_ids(["a", "b"]),
                Roster::from_player_ids(["c"]),
            ],
            ..Default::default()
        };

        assert!(proposal.is_match());
        assert_eq!(proposal.player_ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_filter_defaults_when_deserializing() {
        let filter: Filter = serde_json::from_str(r#"{"attribute":"mmr","min":1200}"#).unwrap();
        assert_eq!(filter.max, 0);
        assert!(filter.stats.is_none());
        assert!(filter.name.is_empty());
    }
}
