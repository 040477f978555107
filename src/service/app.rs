//! Main application state and service coordination
//!
//! [`ServiceContext`] holds the long-lived components shared by request
//! handlers and health checks. [`AppState`] owns the context together with the
//! servers and background tasks, and drives startup and shutdown.

use crate::api::{ApiServer, ApiServerConfig, MmLogicApi};
use crate::config::{validate_config, AppConfig};
use crate::metrics::health::HealthServerConfig;
use crate::metrics::{HealthServer, MetricsCollector, MetricsService};
use crate::service::health::HealthStatus;
use crate::store::{InMemoryStateStore, StateStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },
}

/// Components shared between the API, health checks and background tasks
pub struct ServiceContext {
    config: AppConfig,
    store: Arc<dyn StateStore>,
    api: Arc<MmLogicApi>,
    metrics: Arc<MetricsCollector>,
    is_running: Arc<RwLock<bool>>,
    started_at: Instant,
}

impl ServiceContext {
    /// Wire the API over `store`, reporting to `metrics`
    pub fn new(
        config: AppConfig,
        store: Arc<dyn StateStore>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let api = Arc::new(MmLogicApi::new(store.clone(), &config, metrics.clone()));
        Self {
            config,
            store,
            api,
            metrics,
            is_running: Arc::new(RwLock::new(false)),
            started_at: Instant::now(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn StateStore> {
        self.store.clone()
    }

    pub fn api(&self) -> Arc<MmLogicApi> {
        self.api.clone()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub async fn set_running(&self, running: bool) {
        *self.is_running.write().await = running;
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Production application state
pub struct AppState {
    context: Arc<ServiceContext>,
    metrics_service: Arc<MetricsService>,
    api_server: Arc<ApiServer>,
    background_tasks: Vec<JoinHandle<()>>,
}

impl AppState {
    /// Initialize the application over a fresh in-memory state store
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        Self::with_store(config, Arc::new(InMemoryStateStore::new()))
    }

    /// Initialize the application over an existing state store
    pub fn with_store(config: AppConfig, store: Arc<dyn StateStore>) -> Result<Self, ServiceError> {
        info!("Initializing mmlogic service");
        validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: format!("{:#}", e),
        })?;
        info!(
            "Configuration: service={}, api_port={}, health_port={}, page_size={}, ignorelists={}",
            config.service.name,
            config.service.api_port,
            config.service.health_port,
            config.pool.page_size,
            config
                .ignore_lists
                .iter()
                .map(|l| l.name.as_str())
                .collect::<Vec<_>>()
                .join(",")
        );

        let metrics = Arc::new(
            MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            })?,
        );

        let api_config = ApiServerConfig {
            port: config.service.api_port,
            host: "0.0.0.0".to_string(),
        };
        let health_config = HealthServerConfig {
            port: config.service.health_port,
            host: "0.0.0.0".to_string(),
        };

        let context = Arc::new(ServiceContext::new(config, store, metrics.clone()));
        let api_server = Arc::new(ApiServer::new(api_config, context.api()));
        let health_server = Arc::new(HealthServer::new(health_config, context.clone()));
        let metrics_service = Arc::new(MetricsService::new(metrics, health_server));

        Ok(Self {
            context,
            metrics_service,
            api_server,
            background_tasks: Vec::new(),
        })
    }

    /// Start servers and background tasks
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting mmlogic service");

        self.context.store().ping().await.map_err(|e| ServiceError::Initialization {
            message: format!("State store unreachable: {:#}", e),
        })?;

        self.context.set_running(true).await;

        self.start_metrics_service().await?;
        self.start_api_server().await?;
        self.start_background_tasks().await?;

        info!("✅ mmlogic service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of mmlogic service");

        self.context.set_running(false).await;

        if let Err(e) = self.api_server.stop().await {
            warn!("Failed to stop API server: {}", e);
        } else {
            info!("✅ API server stopped");
        }

        info!("Stopping metrics service...");
        if let Err(e) = self.metrics_service.stop().await {
            warn!("Failed to stop metrics service: {}", e);
        } else {
            info!("✅ Metrics service stopped");
        }

        self.stop_background_tasks().await;

        let metrics = self.context.metrics();
        info!(
            "Final request counts: {}",
            crate::metrics::observer::ALL_OPERATIONS
                .iter()
                .map(|op| format!(
                    "{}={}/{}",
                    op,
                    metrics.requests_for(*op),
                    metrics.errors_for(*op)
                ))
                .collect::<Vec<_>>()
                .join(" ")
        );
        info!("✅ mmlogic service shutdown completed");

        Ok(())
    }

    pub fn context(&self) -> Arc<ServiceContext> {
        self.context.clone()
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        self.context.config()
    }

    pub async fn is_running(&self) -> bool {
        self.context.is_running().await
    }

    pub fn api(&self) -> Arc<MmLogicApi> {
        self.context.api()
    }

    /// Get metrics service
    pub fn metrics_service(&self) -> Arc<MetricsService> {
        self.metrics_service.clone()
    }

    async fn start_metrics_service(&mut self) -> Result<(), ServiceError> {
        info!("Starting metrics and health endpoints");

        let metrics_service = self.metrics_service.clone();
        let port = self.config().service.health_port;

        let handle = tokio::spawn(async move {
            if let Err(e) = metrics_service.start().await {
                error!("Metrics service failed: {}", e);
            } else {
                info!("Metrics service task completed");
            }
        });
        self.background_tasks.push(handle);

        // Give the server a moment to start up
        tokio::time::sleep(Duration::from_millis(100)).await;

        info!("✅ Metrics service started on port {}", port);
        Ok(())
    }

    async fn start_api_server(&mut self) -> Result<(), ServiceError> {
        let api_server = self.api_server.clone();
        let port = self.config().service.api_port;

        let handle = tokio::spawn(async move {
            if let Err(e) = api_server.start().await {
                error!("API server failed: {}", e);
            } else {
                info!("API server task completed");
            }
        });
        self.background_tasks.push(handle);

        tokio::time::sleep(Duration::from_millis(100)).await;

        info!("✅ API server started on port {}", port);
        Ok(())
    }

    /// Start background maintenance tasks
    async fn start_background_tasks(&mut self) -> Result<(), ServiceError> {
        let stats_interval = self.config().stats_interval();
        info!(
            "Starting health metrics task ({}s interval)...",
            stats_interval.as_secs()
        );

        let health_metrics_task = {
            let context = self.context.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(stats_interval);
                let metrics = context.metrics();
                info!("Health metrics task started");

                while context.is_running().await {
                    interval.tick().await;

                    metrics.update_uptime(context.uptime());

                    let store_healthy = match context.store().ping().await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!("State store ping failed: {:#}", e);
                            false
                        }
                    };
                    metrics.update_component_health("state_store", store_healthy);
                    metrics.update_component_health("api", true);
                    let status = if store_healthy {
                        HealthStatus::Healthy
                    } else {
                        HealthStatus::Unhealthy
                    };
                    metrics.update_health_status(status.as_gauge());

                    debug!(
                        "Updated service health metrics - uptime: {}s, store healthy: {}",
                        context.uptime().as_secs(),
                        store_healthy
                    );
                }

                info!("Health metrics task stopped");
            })
        };
        self.background_tasks.push(health_metrics_task);

        info!("Background maintenance tasks started successfully");
        Ok(())
    }

    async fn stop_background_tasks(&mut self) {
        let task_count = self.background_tasks.len();
        if task_count == 0 {
            info!("No background tasks to stop");
            return;
        }

        info!("Stopping {} background tasks...", task_count);
        for (i, task) in self.background_tasks.drain(..).enumerate() {
            debug!("Aborting background task {}/{}", i + 1, task_count);
            task.abort();
        }

        // Give tasks time to clean up gracefully
        tokio::time::sleep(Duration::from_millis(200)).await;

        info!("✅ All {} background tasks stopped", task_count);
    }
}
