//! Ignorelist configuration

use serde::{Deserialize, Serialize};

/// One configured ignorelist
///
/// Lists are plain sets with no per-entry timestamps, so there is no retention
/// window to configure. Unknown keys are rejected rather than ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IgnoreListSettings {
    pub name: String,
    /// Storage key; the list name is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl IgnoreListSettings {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: None,
        }
    }

    pub fn storage_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.name)
    }
}

/// Lists consulted during pool resolution, in read order
pub fn default_ignore_lists() -> Vec<IgnoreListSettings> {
    vec![
        IgnoreListSettings::named("proposed"),
        IgnoreListSettings::named("deindexed"),
    ]
}

/// Parse a comma-separated `name[=key]` list
pub fn parse_ignore_lists(raw: &str) -> anyhow::Result<Vec<IgnoreListSettings>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((name, key)) if !name.trim().is_empty() && !key.trim().is_empty() => {
                Ok(IgnoreListSettings {
                    name: name.trim().to_string(),
                    key: Some(key.trim().to_string()),
                })
            }
            Some(_) => Err(anyhow::anyhow!("Invalid ignorelist entry: {}", entry)),
            None => Ok(IgnoreListSettings::named(entry)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ignore_lists() {
        let lists = parse_ignore_lists("proposed, deindexed=players.deindexed,").unwrap();
        assert_eq!(lists.len(), 2);
        assert_eq!(lists[0].storage_key(), "proposed");
        assert_eq!(lists[1].name, "deindexed");
        assert_eq!(lists[1].storage_key(), "players.deindexed");

        assert!(parse_ignore_lists("broken=").is_err());
    }

    #[test]
    fn test_per_list_retention_keys_are_rejected() {
        #[derive(Deserialize)]
        struct Lists {
            ignore_lists: Vec<IgnoreListSettings>,
        }

        let ok: Lists = toml::from_str(
            r#"
            [[ignore_lists]]
            name = "proposed"
            "#,
        )
        .unwrap();
        assert_eq!(ok.ignore_lists[0], IgnoreListSettings::named("proposed"));

        let err = toml::from_str::<Lists>(
            r#"
            [[ignore_lists]]
            name = "proposed"
            duration = 800
            "#,
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("duration"));
    }
}
