//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the mmlogic service using
//! Prometheus metrics. The collector is also the service's [`Observer`]: every
//! event reported by the matchmaking logic becomes a metric update and a
//! structured log line.

use crate::error::ErrorKind;
use crate::metrics::observer::{Notice, Observer, Operation};
use crate::pool::FilterOutcome;
use crate::types::Stats;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Main metrics collector for the matchmaking logic service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Pool resolution metrics
    pool_metrics: PoolMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Successful API requests
    pub requests_total: IntCounterVec,

    /// Failed API requests
    pub errors_total: IntCounterVec,

    /// Request handling time
    pub request_duration: HistogramVec,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,
}

/// Pool resolution metrics
#[derive(Clone)]
pub struct PoolMetrics {
    /// Filter evaluations by outcome
    pub filter_outcomes_total: IntCounterVec,

    /// Players matched per filter
    pub filter_size: Histogram,

    /// Filter evaluation time
    pub filter_duration: Histogram,

    /// Players in resolved pools
    pub pool_size: Histogram,

    /// Pool resolution time
    pub pool_duration: Histogram,

    /// Non-fatal conditions by kind
    pub notices_total: IntCounterVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let pool_metrics = PoolMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            pool_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get pool metrics
    pub fn pool(&self) -> &PoolMetrics {
        &self.pool_metrics
    }

    /// Update service uptime
    pub fn update_uptime(&self, uptime: Duration) {
        self.service_metrics
            .uptime_seconds
            .set(uptime.as_secs() as i64);
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }

    /// Total successful requests for one operation
    pub fn requests_for(&self, operation: Operation) -> u64 {
        self.service_metrics
            .requests_total
            .with_label_values(&[operation.as_str()])
            .get()
    }

    /// Total failed requests for one operation, across error kinds
    pub fn errors_for(&self, operation: Operation) -> u64 {
        ErrorKind::ALL
            .iter()
            .map(|kind| {
                self.service_metrics
                    .errors_total
                    .with_label_values(&[operation.as_str(), kind.as_str()])
                    .get()
            })
            .sum()
    }
}

impl Observer for MetricsCollector {
    fn record_request(&self, operation: Operation, elapsed: Duration) {
        self.service_metrics
            .requests_total
            .with_label_values(&[operation.as_str()])
            .inc();
        self.service_metrics
            .request_duration
            .with_label_values(&[operation.as_str()])
            .observe(elapsed.as_secs_f64());
    }

    fn record_error(&self, operation: Operation, kind: ErrorKind, elapsed: Duration) {
        self.service_metrics
            .errors_total
            .with_label_values(&[operation.as_str(), kind.as_str()])
            .inc();
        self.service_metrics
            .request_duration
            .with_label_values(&[operation.as_str()])
            .observe(elapsed.as_secs_f64());
    }

    fn record_filter(&self, attribute: &str, stats: &Stats, outcome: &FilterOutcome) {
        self.pool_metrics
            .filter_outcomes_total
            .with_label_values(&[outcome.label()])
            .inc();
        self.pool_metrics.filter_size.observe(stats.count as f64);
        self.pool_metrics.filter_duration.observe(stats.elapsed);

        match outcome {
            FilterOutcome::Large { count } => {
                warn!(
                    "Filter on '{}' is large ({} players), resolving anyway",
                    attribute, count
                );
            }
            FilterOutcome::TooBroad { count } => {
                warn!(
                    "Filter on '{}' applies to too many players ({})",
                    attribute, count
                );
            }
            FilterOutcome::NoMatchingPlayers => {
                debug!("Filter on '{}' matched no players", attribute);
            }
            FilterOutcome::Complete => {
                debug!(
                    "Filter on '{}' matched {} players in {:.4}s",
                    attribute, stats.count, stats.elapsed
                );
            }
        }
    }

    fn record_pool(&self, pool: &str, stats: &Stats) {
        self.pool_metrics.pool_size.observe(stats.count as f64);
        self.pool_metrics.pool_duration.observe(stats.elapsed);
        info!(
            "Resolved pool '{}': {} players in {:.4}s",
            pool, stats.count, stats.elapsed
        );
    }

    fn record_notice(&self, notice: Notice) {
        self.pool_metrics
            .notices_total
            .with_label_values(&[notice.label()])
            .inc();

        match notice {
            Notice::TooBroadFilterDisregarded {
                pool,
                attribute,
                count,
            } => {
                warn!(
                    "Disregarding filter on '{}' ({} players) while resolving pool '{}'",
                    attribute, count, pool
                );
            }
            Notice::IgnoreListsUnavailable { pool, error: err } => {
                error!(
                    "Ignorelists unavailable while resolving pool '{}', continuing without exclusions: {}",
                    pool, err
                );
            }
            Notice::EmptyProposalRosters { proposal_id } => {
                warn!(
                    "Proposal {} has no players in its rosters, nothing added to the proposed ignorelist",
                    proposal_id
                );
            }
            Notice::WorkerCounterNotDecremented { proposal_id, error: err } => {
                error!(
                    "Failed to decrement worker counter for proposal {}: {}",
                    proposal_id, err
                );
            }
        }
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds = IntGauge::new("mmlogic_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let requests_total = IntCounterVec::new(
            Opts::new("mmlogic_requests_total", "Successful API requests"),
            &["method"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let errors_total = IntCounterVec::new(
            Opts::new("mmlogic_errors_total", "Failed API requests"),
            &["method", "kind"],
        )?;
        registry.register(Box::new(errors_total.clone()))?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "mmlogic_request_duration_seconds",
                "API request handling time",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
            &["method"],
        )?;
        registry.register(Box::new(request_duration.clone()))?;

        let health_status = IntGauge::new(
            "mmlogic_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("mmlogic_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            uptime_seconds,
            requests_total,
            errors_total,
            request_duration,
            health_status,
            component_health,
        })
    }
}

impl PoolMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let filter_outcomes_total = IntCounterVec::new(
            Opts::new(
                "mmlogic_filter_outcomes_total",
                "Filter evaluations by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(filter_outcomes_total.clone()))?;

        let size_buckets = vec![
            0.0, 10.0, 100.0, 1_000.0, 10_000.0, 100_000.0, 500_000.0, 1_000_000.0,
        ];

        let filter_size = Histogram::with_opts(
            HistogramOpts::new("mmlogic_filter_size_players", "Players matched per filter")
                .buckets(size_buckets.clone()),
        )?;
        registry.register(Box::new(filter_size.clone()))?;

        let filter_duration = Histogram::with_opts(
            HistogramOpts::new(
                "mmlogic_filter_duration_seconds",
                "Filter evaluation time",
            )
            .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(filter_duration.clone()))?;

        let pool_size = Histogram::with_opts(
            HistogramOpts::new("mmlogic_pool_size_players", "Players in resolved pools")
                .buckets(size_buckets),
        )?;
        registry.register(Box::new(pool_size.clone()))?;

        let pool_duration = Histogram::with_opts(
            HistogramOpts::new("mmlogic_pool_duration_seconds", "Pool resolution time")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
        )?;
        registry.register(Box::new(pool_duration.clone()))?;

        let notices_total = IntCounterVec::new(
            Opts::new(
                "mmlogic_notices_total",
                "Non-fatal conditions reported during request handling",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(notices_total.clone()))?;

        Ok(Self {
            filter_outcomes_total,
            filter_size,
            filter_duration,
            pool_size,
            pool_duration,
            notices_total,
        })
    }
}
