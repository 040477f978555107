//! Monitoring endpoints on the health port
//!
//! Routes:
//! - `GET /health` full health report, 503 when unhealthy
//! - `GET /ready` plain-text readiness probe
//! - `GET /metrics` Prometheus text exposition
//! - `GET /stats` request counts per operation and state store gauges

use crate::metrics::observer::ALL_OPERATIONS;
use crate::service::app::ServiceContext;
use crate::service::health::{HealthCheck, HealthStatus};
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Health server configuration
#[derive(Debug, Clone)]
pub struct HealthServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for HealthServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// HTTP server for probes and metrics
pub struct HealthServer {
    config: HealthServerConfig,
    context: Arc<ServiceContext>,
    shutdown_tx: broadcast::Sender<()>,
}

impl HealthServer {
    pub fn new(config: HealthServerConfig, context: Arc<ServiceContext>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            context,
            shutdown_tx,
        }
    }

    /// Serve until [`HealthServer::stop`] is called
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid health server address")?;

        let listener = TcpListener::bind(addr).await?;
        info!("Health server listening on http://{}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Health server shutdown signal received");
            })
            .await?;

        info!("Health server stopped");
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to health server: {}", e);
        }
        Ok(())
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/ready", get(ready_handler))
            .route("/metrics", get(metrics_handler))
            .route("/stats", get(stats_handler))
            .with_state(self.context.clone())
    }
}

fn probe_status(status: &HealthStatus) -> StatusCode {
    match status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn health_handler(State(context): State<Arc<ServiceContext>>) -> Response {
    match HealthCheck::check(context).await {
        Ok(report) => (probe_status(&report.status), Json(report)).into_response(),
        Err(e) => {
            error!("Health check failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": HealthStatus::Unhealthy, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn ready_handler(State(context): State<Arc<ServiceContext>>) -> (StatusCode, &'static str) {
    match HealthCheck::readiness_check(context).await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "ready"),
        Ok(HealthStatus::Degraded) => (StatusCode::OK, "degraded"),
        Ok(HealthStatus::Unhealthy) => (StatusCode::SERVICE_UNAVAILABLE, "not ready"),
        Err(e) => {
            error!("Readiness check failed: {:#}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "not ready")
        }
    }
}

async fn metrics_handler(State(context): State<Arc<ServiceContext>>) -> Response {
    let families = context.metrics().registry().gather();
    let encoder = TextEncoder::new();

    match encoder.encode_to_string(&families) {
        Ok(body) => {
            debug!("Serving {} metric families", families.len());
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, encoder.format_type().to_string())],
                body,
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct OperationCounts {
    requests: u64,
    errors: u64,
}

#[derive(Debug, Serialize)]
struct ServiceSnapshot {
    status: HealthStatus,
    uptime_seconds: u64,
    operations: BTreeMap<&'static str, OperationCounts>,
    proposals_queued: usize,
    workers_in_flight: i64,
    ignorelists: BTreeMap<String, usize>,
}

async fn stats_handler(State(context): State<Arc<ServiceContext>>) -> Response {
    let report = match HealthCheck::check(context.clone()).await {
        Ok(report) => report,
        Err(e) => {
            error!("Failed to gather stats: {:#}", e);
            return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": e.to_string() })))
                .into_response();
        }
    };

    let metrics = context.metrics();
    let operations = ALL_OPERATIONS
        .iter()
        .map(|op| {
            (
                op.as_str(),
                OperationCounts {
                    requests: metrics.requests_for(*op),
                    errors: metrics.errors_for(*op),
                },
            )
        })
        .collect();

    Json(ServiceSnapshot {
        status: report.status,
        uptime_seconds: report.stats.uptime_seconds,
        operations,
        proposals_queued: report.stats.proposals_queued,
        workers_in_flight: report.stats.workers_in_flight,
        ignorelists: report.stats.ignorelists,
    })
    .into_response()
}
