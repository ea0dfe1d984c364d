//! Gateway URL discovery

use crate::error::GatewayResult;
use async_trait::async_trait;
use kook_http::HttpClient;

/// Resolves the WebSocket URL to open for a connection attempt
///
/// Called once per attempt, so a fresh URL is fetched on every reconnect.
#[async_trait]
pub trait GatewayLocator: Send + Sync {
    async fn locate(&self, compress: bool) -> GatewayResult<String>;
}

#[async_trait]
impl GatewayLocator for HttpClient {
    async fn locate(&self, compress: bool) -> GatewayResult<String> {
        Ok(self.gateway_url(compress).await?)
    }
}

/// A fixed gateway URL
#[derive(Debug, Clone)]
pub struct StaticGateway {
    url: String,
}

impl StaticGateway {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl GatewayLocator for StaticGateway {
    async fn locate(&self, _compress: bool) -> GatewayResult<String> {
        Ok(self.url.clone())
    }
}
