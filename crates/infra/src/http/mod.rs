//! HTTP transport for the Taiga REST API

pub mod client;
pub mod request;
pub mod transport;

pub use client::{TaigaHttpClient, TaigaHttpClientBuilder};
pub use request::ApiRequest;
pub use transport::ApiTransport;
