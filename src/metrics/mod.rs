//! Metrics and monitoring for the mmlogic service
//!
//! `observer` defines the narrow interface the matchmaking logic reports to.
//! `collector` implements it with Prometheus metrics and tracing, and `health`
//! serves those metrics alongside liveness and readiness probes.

pub mod collector;
pub mod health;
pub mod observer;

pub use collector::{MetricsCollector, PoolMetrics, ServiceMetrics};
pub use health::HealthServer;
pub use observer::{Notice, NullObserver, Observer, Operation};

use std::sync::Arc;

/// Unified metrics service that combines all monitoring capabilities
#[derive(Clone)]
pub struct MetricsService {
    collector: Arc<MetricsCollector>,
    health_server: Arc<HealthServer>,
}

impl MetricsService {
    pub fn new(collector: Arc<MetricsCollector>, health_server: Arc<HealthServer>) -> Self {
        Self {
            collector,
            health_server,
        }
    }

    /// Get the metrics collector
    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn health_server(&self) -> Arc<HealthServer> {
        self.health_server.clone()
    }

    /// Start the metrics service (health endpoints)
    pub async fn start(&self) -> anyhow::Result<()> {
        self.health_server.start().await
    }

    /// Stop the metrics service
    pub async fn stop(&self) -> anyhow::Result<()> {
        self.health_server.stop().await
    }
}
