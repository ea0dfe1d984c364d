//! Session configuration

use crate::heartbeat::HeartbeatConfig;
use kook_common::ClientConfig;
use std::time::Duration;

/// Reconnect schedule shared by `connect()` and the recovery loop
///
/// The delay before attempt `n` is `base_delay * (n - 1)`, so the first
/// attempt runs immediately and later ones back off linearly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl ReconnectPolicy {
    /// Create a policy; at least one attempt is always made
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay to wait before the given 1-based attempt
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.saturating_sub(1))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(5))
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Ask the gateway for zlib-compressed frames
    pub compress: bool,
    /// `Authorization` header sent on the WebSocket upgrade
    pub authorization: Option<String>,
    pub heartbeat: HeartbeatConfig,
    pub reconnect: ReconnectPolicy,
    pub connect_timeout: Duration,
    /// How long to wait for the handshake or resume-ack after the upgrade
    pub handshake_timeout: Duration,
    /// Buffer size of the notice broadcast channel
    pub notice_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            compress: true,
            authorization: None,
            heartbeat: HeartbeatConfig::default(),
            reconnect: ReconnectPolicy::default(),
            connect_timeout: Duration::from_secs(10),
            handshake_timeout: Duration::from_secs(6),
            notice_capacity: 64,
        }
    }
}

impl SessionConfig {
    /// Build from loaded client configuration
    #[must_use]
    pub fn from_client_config(config: &ClientConfig) -> Self {
        let gateway = &config.gateway;
        Self {
            compress: gateway.compress,
            authorization: Some(config.authorization()),
            heartbeat: HeartbeatConfig {
                interval: gateway.heartbeat_interval,
                ..HeartbeatConfig::default()
            },
            reconnect: ReconnectPolicy::new(
                gateway.reconnect_max_attempts,
                gateway.reconnect_delay,
            ),
            ..Self::default()
        }
    }
}
