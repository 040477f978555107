//! Service layer for the mmlogic service
//!
//! This module contains the main application state, service coordination,
//! and background task management for the production service.

pub mod app;
pub mod health;

pub use app::{AppState, ServiceContext, ServiceError};
pub use health::{HealthCheck, HealthStatus};
