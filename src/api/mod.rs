//! Matchmaking logic API
//!
//! `service` holds the transport-independent operations; `http` serves them
//! over HTTP/JSON with axum.

pub mod http;
pub mod service;

pub use http::{ApiServer, ApiServerConfig};
pub use service::{proposal_result, MmLogicApi};
