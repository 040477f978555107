//! Health check endpoints and monitoring
//!
//! This module provides health check functionality for the mmlogic service,
//! including readiness and liveness probes.

use crate::service::app::ServiceContext;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Gauge value exported to Prometheus
    pub fn as_gauge(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    /// Optional error message if unhealthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Proposals waiting on the evaluation queue
    pub proposals_queued: usize,
    /// Current value of the concurrent-worker counter
    pub workers_in_flight: i64,
    /// Size of every configured ignorelist, by name
    pub ignorelists: BTreeMap<String, usize>,
    pub uptime_seconds: u64,
}

impl HealthCheck {
    /// Perform a comprehensive health check of the service
    pub async fn check(context: Arc<ServiceContext>) -> Result<Self> {
        let mut checks = Vec::new();
        let mut overall_status = HealthStatus::Healthy;

        let service_check = Self::check_service_running(&context).await;
        if service_check.status != HealthStatus::Healthy {
            overall_status = HealthStatus::Unhealthy;
        }
        checks.push(service_check);

        let store_check = Self::check_state_store(&context).await;
        if store_check.status == HealthStatus::Unhealthy {
            overall_status = HealthStatus::Unhealthy;
        } else if store_check.status == HealthStatus::Degraded
            && overall_status == HealthStatus::Healthy
        {
            overall_status = HealthStatus::Degraded;
        }
        checks.push(store_check);

        let stats = Self::gather_service_stats(&context).await;

        Ok(HealthCheck {
            status: overall_status,
            service: context.config().service.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats,
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(context: Arc<ServiceContext>) -> Result<HealthStatus> {
        if context.is_running().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    /// Readiness check - the service is running and its state store answers
    pub async fn readiness_check(context: Arc<ServiceContext>) -> Result<HealthStatus> {
        if !context.is_running().await {
            return Ok(HealthStatus::Unhealthy);
        }

        Ok(Self::check_state_store(&context).await.status)
    }

    async fn check_service_running(context: &ServiceContext) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = if context.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn check_state_store(context: &ServiceContext) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = match context.store().ping().await {
            Ok(()) => (HealthStatus::Healthy, None),
            Err(e) => {
                error!("State store ping failed: {:#}", e);
                (
                    HealthStatus::Unhealthy,
                    Some(format!("State store unreachable: {}", e)),
                )
            }
        };

        ComponentCheck {
            name: "state_store".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn gather_service_stats(context: &ServiceContext) -> ServiceStats {
        let store = context.store();
        let config = context.config();

        let proposals_queued = match store.set_members(&config.proposals.queue_name).await {
            Ok(members) => members.len(),
            Err(e) => {
                debug!("Failed to read proposal queue for health check: {}", e);
                0
            }
        };
        // A zero increment reads the counter without changing it
        let workers_in_flight = match store
            .increment(&config.proposals.worker_counter_key, 0)
            .await
        {
            Ok(value) => value,
            Err(e) => {
                debug!("Failed to read worker counter for health check: {}", e);
                0
            }
        };

        let mut ignorelists = BTreeMap::new();
        for list in &config.ignore_lists {
            match store.set_members(list.storage_key()).await {
                Ok(members) => {
                    ignorelists.insert(list.name.clone(), members.len());
                }
                Err(e) => debug!("Failed to read ignorelist '{}' for health check: {}", list.name, e),
            }
        }

        ServiceStats {
            proposals_queued,
            workers_in_flight,
            ignorelists,
            uptime_seconds: context.uptime().as_secs(),
        }
    }
}

/// Convert health check to JSON string
impl HealthCheck {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::metrics::MetricsCollector;
    use crate::store::{InMemoryStateStore, StateStore};

    fn context(store: Arc<InMemoryStateStore>) -> Arc<ServiceContext> {
        Arc::new(ServiceContext::new(
            AppConfig::default(),
            store,
            Arc::new(MetricsCollector::new().unwrap()),
        ))
    }

    #[tokio::test]
    async fn test_liveness_follows_running_flag() {
        let context = context(Arc::new(InMemoryStateStore::new()));

        assert_eq!(
            HealthCheck::liveness_check(context.clone()).await.unwrap(),
            HealthStatus::Unhealthy
        );
        context.set_running(true).await;
        assert_eq!(
            HealthCheck::liveness_check(context.clone()).await.unwrap(),
            HealthStatus::Healthy
        );
        assert_eq!(
            HealthCheck::readiness_check(context).await.unwrap(),
            HealthStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_check_reports_store_stats() {
        let store = Arc::new(InMemoryStateStore::new());
        store
            .set_add("proposalq", &["m1".to_string(), "m2".to_string()])
            .await
            .unwrap();
        store
            .set_add("proposed", &["a".to_string(), "b".to_string(), "c".to_string()])
            .await
            .unwrap();
        store.increment("concurrentMMFs", 4).await.unwrap();

        let context = context(store);
        context.set_running(true).await;

        let health = HealthCheck::check(context).await.unwrap();
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.checks.len(), 2);
        assert_eq!(health.stats.proposals_queued, 2);
        assert_eq!(health.stats.ignorelists.get("proposed"), Some(&3));
        assert_eq!(health.stats.ignorelists.get("deindexed"), Some(&0));
        assert_eq!(health.stats.workers_in_flight, 4);
        assert!(health.to_json().unwrap().contains("state_store"));
    }

    #[test]
    fn test_health_status_gauge() {
        assert_eq!(HealthStatus::Healthy.as_gauge(), 2);
        assert_eq!(HealthStatus::Degraded.as_gauge(), 1);
        assert_eq!(HealthStatus::Unhealthy.as_gauge(), 0);
    }
}
