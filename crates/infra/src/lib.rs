//! # Taiga MCP Infrastructure
//!
//! Boundary adapters for the resilience layer in `taiga-mcp-common`.
//!
//! This crate contains:
//! - The `reqwest` transport for the Taiga REST API, which turns HTTP
//!   statuses into classified [`ApiError`](taiga_mcp_common::ApiError)s
//! - The Taiga refresh-token adapter
//! - [`ApiGateway`], which wires rate limiting, retry, credentials, batching
//!   and metrics around every call
//! - Tracing subscriber setup

pub mod auth;
mod errors;
pub mod gateway;
pub mod http;
pub mod logging;

// Re-export commonly used items
pub use auth::TaigaTokenRefresher;
pub use gateway::{ApiGateway, ApiGatewayBuilder};
pub use http::{ApiRequest, ApiTransport, TaigaHttpClient};
pub use logging::{init_tracing, LogFormat};
