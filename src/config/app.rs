//! Main application configuration
//!
//! This module defines the primary configuration structures for the mmlogic
//! service, including environment variable and TOML file loading and validation.

use super::ignorelist::{default_ignore_lists, parse_ignore_lists, IgnoreListSettings};
use super::pool::PoolConfig;
use super::proposal::ProposalConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub pool: PoolConfig,
    pub proposals: ProposalConfig,
    pub ignore_lists: Vec<IgnoreListSettings>,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for the matchmaking logic API
    pub api_port: u16,
    /// Port for health check and metrics endpoints
    pub health_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
    /// Interval for refreshing service gauges
    pub stats_interval_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: ServiceSettings::default(),
            pool: PoolConfig::default(),
            proposals: ProposalConfig::default(),
            ignore_lists: default_ignore_lists(),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "mmlogic".to_string(),
            log_level: "info".to_string(),
            api_port: 50503,
            health_port: 8080,
            shutdown_timeout_seconds: 30,
            stats_interval_seconds: 15,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!("Invalid {} value: {}", name, value))
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables still override it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(port) = env::var("API_PORT") {
            self.service.api_port = parse_var("API_PORT", &port)?;
        }
        if let Ok(port) = env::var("HEALTH_PORT") {
            self.service.health_port = parse_var("HEALTH_PORT", &port)?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds =
                parse_var("SHUTDOWN_TIMEOUT_SECONDS", &timeout)?;
        }

        // Pool settings
        if let Ok(size) = env::var("PAGE_SIZE") {
            self.pool.page_size = parse_var("PAGE_SIZE", &size)?;
        }
        if let Ok(size) = env::var("BATCH_SIZE") {
            self.pool.batch_size = parse_var("BATCH_SIZE", &size)?;
        }
        if let Ok(threshold) = env::var("LARGE_FILTER_THRESHOLD") {
            self.pool.large_filter_threshold = parse_var("LARGE_FILTER_THRESHOLD", &threshold)?;
        }
        if let Ok(ceiling) = env::var("FILTER_CEILING") {
            self.pool.filter_ceiling = parse_var("FILTER_CEILING", &ceiling)?;
        }
        if let Ok(fail) = env::var("FAIL_ON_TOO_BROAD") {
            self.pool.fail_on_too_broad = parse_var("FAIL_ON_TOO_BROAD", &fail)?;
        }
        if let Ok(policy) = env::var("IGNORE_LIST_FAILURE") {
            self.pool.ignore_list_failure = policy.parse()?;
        }

        // Proposal settings
        if let Ok(queue) = env::var("PROPOSAL_QUEUE") {
            self.proposals.queue_name = queue;
        }
        if let Ok(key) = env::var("WORKER_COUNTER_KEY") {
            self.proposals.worker_counter_key = key;
        }
        if let Ok(list) = env::var("PROPOSED_LIST") {
            self.proposals.proposed_list = list;
        }
        if let Ok(policy) = env::var("COUNTER_FAILURE") {
            self.proposals.counter_failure = policy.parse()?;
        }

        // Ignorelists
        if let Ok(lists) = env::var("IGNORE_LISTS") {
            self.ignore_lists = parse_ignore_lists(&lists)?;
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get stats refresh interval as Duration
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.service.stats_interval_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.service.api_port == 0 {
        return Err(anyhow!("API port cannot be 0"));
    }
    if config.service.health_port == 0 {
        return Err(anyhow!("Health port cannot be 0"));
    }
    if config.service.api_port == config.service.health_port {
        return Err(anyhow!("API and health ports must differ"));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.service.stats_interval_seconds == 0 {
        return Err(anyhow!("Stats interval must be greater than 0"));
    }

    // Validate pool settings
    if config.pool.page_size == 0 {
        return Err(anyhow!("Page size must be greater than 0"));
    }
    if config.pool.batch_size == 0 {
        return Err(anyhow!("Batch size must be greater than 0"));
    }
    if config.pool.large_filter_threshold <= 0 {
        return Err(anyhow!("Large filter threshold must be positive"));
    }
    if config.pool.filter_ceiling < config.pool.large_filter_threshold {
        return Err(anyhow!(
            "Filter ceiling must not be below the large filter threshold"
        ));
    }

    // Validate proposal settings
    if config.proposals.queue_name.is_empty() {
        return Err(anyhow!("Proposal queue name cannot be empty"));
    }
    if config.proposals.worker_counter_key.is_empty() {
        return Err(anyhow!("Worker counter key cannot be empty"));
    }

    // Validate ignorelists
    let mut names = HashSet::new();
    for list in &config.ignore_lists {
        if list.name.is_empty() {
            return Err(anyhow!("Ignorelist name cannot be empty"));
        }
        if !names.insert(list.name.as_str()) {
            return Err(anyhow!("Duplicate ignorelist: {}", list.name));
        }
    }
    if !names.contains(config.proposals.proposed_list.as_str()) {
        return Err(anyhow!(
            "Proposed list '{}' is not a configured ignorelist",
            config.proposals.proposed_list
        ));
    }

    Ok(())
}
