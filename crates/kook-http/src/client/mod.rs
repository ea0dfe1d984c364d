//! Platform API client

mod envelope;
mod http_client;

pub use envelope::{ApiEnvelope, GatewayIndex};
pub use http_client::{HttpClient, HttpClientBuilder};
