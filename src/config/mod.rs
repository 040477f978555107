//! Configuration management for the mmlogic service
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and default values.

pub mod app;
pub mod ignorelist;
pub mod pool;
pub mod proposal;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ServiceSettings};
pub use ignorelist::IgnoreListSettings;
pub use pool::{IgnoreListFailurePolicy, PoolConfig};
pub use proposal::{CounterFailurePolicy, ProposalConfig};
