//! HTTP/JSON transport for the matchmaking logic API
//!
//! Routes:
//! - `GET  /v1/profiles/{id}`
//! - `POST /v1/proposals`
//! - `POST /v1/pools` (newline-delimited JSON, one page per line)
//! - `GET  /v1/ignorelists`
//! - `GET  /v1/ignorelists/proposed`

use crate::api::service::{proposal_result, MmLogicApi};
use crate::error::{ErrorKind, Result};
use crate::pool::PageSink;
use crate::types::{MatchObject, PlayerPool};
use anyhow::Context;
use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Pages buffered between the resolver task and the HTTP body
const PAGE_BUFFER: usize = 4;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            port: 50503,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// HTTP server for [`MmLogicApi`]
pub struct ApiServer {
    config: ApiServerConfig,
    api: Arc<MmLogicApi>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, api: Arc<MmLogicApi>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            api,
            shutdown_tx,
        }
    }

    /// Serve until [`ApiServer::stop`] is called
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid API server address")?;

        let listener = TcpListener::bind(addr).await?;
        info!("Matchmaking logic API listening on http://{}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("API server shutdown signal received");
            })
            .await?;

        info!("API server stopped");
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to API server: {}", e);
        }
        Ok(())
    }

    /// Router with every API route
    pub fn router(&self) -> Router {
        Router::new()
            .route("/v1/profiles/{id}", get(get_profile_handler))
            .route("/v1/proposals", post(create_proposal_handler))
            .route("/v1/pools", post(get_player_pool_handler))
            .route("/v1/ignorelists", get(all_ignored_handler))
            .route("/v1/ignorelists/proposed", get(list_ignored_handler))
            .with_state(self.api.clone())
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Storage => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::FilterTooBroad => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Configuration => StatusCode::BAD_REQUEST,
        ErrorKind::TransportSend | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(request_id: Uuid, err: &anyhow::Error) -> Response {
    let kind = ErrorKind::of(err);
    (
        status_for(kind),
        Json(json!({
            "error": err.to_string(),
            "kind": kind.as_str(),
            "request_id": request_id,
        })),
    )
        .into_response()
}

async fn get_profile_handler(
    State(api): State<Arc<MmLogicApi>>,
    Path(id): Path<String>,
) -> Response {
    let request_id = Uuid::new_v4();
    debug!("[{}] GET /v1/profiles/{}", request_id, id);

    match api.get_profile(&id).await {
        Ok(profile) => Json(profile).into_response(),
        Err(err) => error_response(request_id, &err),
    }
}

async fn create_proposal_handler(
    State(api): State<Arc<MmLogicApi>>,
    Json(proposal): Json<MatchObject>,
) -> Response {
    let request_id = Uuid::new_v4();
    debug!("[{}] POST /v1/proposals id={}", request_id, proposal.id);

    let outcome = api.create_proposal(&proposal).await;
    let status = match &outcome {
        Ok(_) => StatusCode::OK,
        Err(err) => status_for(ErrorKind::of(err)),
    };
    (status, Json(proposal_result(&outcome))).into_response()
}

async fn all_ignored_handler(State(api): State<Arc<MmLogicApi>>) -> Response {
    let request_id = Uuid::new_v4();
    debug!("[{}] GET /v1/ignorelists", request_id);

    match api.get_all_ignored_players().await {
        Ok(roster) => Json(roster).into_response(),
        Err(err) => error_response(request_id, &err),
    }
}

async fn list_ignored_handler(State(api): State<Arc<MmLogicApi>>) -> Response {
    let request_id = Uuid::new_v4();
    debug!("[{}] GET /v1/ignorelists/proposed", request_id);

    match api.list_ignored_players().await {
        Ok(roster) => Json(roster).into_response(),
        Err(err) => error_response(request_id, &err),
    }
}

/// Forwards pages to the HTTP response body
struct ChannelSink {
    tx: mpsc::Sender<PlayerPool>,
}

#[async_trait]
impl PageSink for ChannelSink {
    async fn send_page(&mut self, page: PlayerPool) -> Result<()> {
        self.tx
            .send(page)
            .await
            .map_err(|_| anyhow::anyhow!("client disconnected"))
    }
}

fn ndjson_line(page: &PlayerPool) -> std::result::Result<String, std::io::Error> {
    serde_json::to_string(page)
        .map(|mut line| {
            line.push('\n');
            line
        })
        .map_err(std::io::Error::other)
}

async fn get_player_pool_handler(
    State(api): State<Arc<MmLogicApi>>,
    Json(pool): Json<PlayerPool>,
) -> Response {
    let request_id = Uuid::new_v4();
    debug!("[{}] POST /v1/pools name={}", request_id, pool.name);

    let (tx, mut rx) = mpsc::channel(PAGE_BUFFER);
    let resolver = {
        let api = api.clone();
        tokio::spawn(async move {
            let mut sink = ChannelSink { tx };
            api.get_player_pool(pool, &mut sink).await
        })
    };

    // A successful resolution always yields at least one page, so a closed
    // channel before the first page means the resolver failed.
    let first = match rx.recv().await {
        Some(page) => page,
        None => {
            let err = match resolver.await {
                Ok(Err(err)) => err,
                Ok(Ok(_)) => anyhow::anyhow!("pool resolution produced no pages"),
                Err(join_err) => anyhow::anyhow!("pool resolution task failed: {}", join_err),
            };
            return error_response(request_id, &err);
        }
    };

    let pages = tokio_stream::once(first)
        .chain(ReceiverStream::new(rx))
        .map(|page| ndjson_line(&page));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header("x-request-id", request_id.to_string())
        .body(Body::from_stream(pages))
        .unwrap_or_else(|e| {
            let err = anyhow::anyhow!("failed to build response: {}", e);
            error_response(request_id, &err)
        })
}
