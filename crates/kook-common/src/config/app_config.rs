//! Client configuration
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use serde::Deserialize;
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Main client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub env: Environment,
    /// Bot credential
    pub token: String,
    pub token_type: TokenType,
    pub http: HttpSettings,
    pub gateway: GatewaySettings,
    pub webhook: WebhookSettings,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            _ => Err(()),
        }
    }
}

/// Credential scheme used in the `Authorization` header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenType {
    #[default]
    Bot,
    Bearer,
}

impl TokenType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bot => "Bot",
            Self::Bearer => "Bearer",
        }
    }

    /// Full header value for a token
    #[must_use]
    pub fn authorization(self, token: &str) -> String {
        format!("{} {token}", self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bot" => Ok(Self::Bot),
            "bearer" => Ok(Self::Bearer),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request transport settings
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

/// Streaming gateway settings
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Negotiate zlib-compressed frames
    pub compress: bool,
    pub heartbeat_interval: Duration,
    pub reconnect_max_attempts: u32,
    /// Base of the linear reconnect delay
    pub reconnect_delay: Duration,
}

/// Push-delivery endpoint settings
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    /// Shared secret; verification is skipped when absent
    pub verify_token: Option<String>,
    pub addr: SocketAddr,
    pub path: String,
}

// Default value functions
fn default_base_url() -> String {
    "https://www.kookapp.cn/api".to_string()
}

fn default_user_agent() -> String {
    concat!("kook-rs/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

fn default_reconnect_max_attempts() -> u32 {
    10
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_webhook_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

/// Parse an optional variable, failing on a present but malformed value
fn parse_or<T, F>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        None => Ok(default),
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `KOOK_TOKEN` is missing or a value fails to parse
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("KOOK_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingVar("KOOK_TOKEN"))?;

        let token_type = match lookup("KOOK_TOKEN_TYPE") {
            Some(raw) => raw
                .parse()
                .map_err(|()| ConfigError::InvalidValue("KOOK_TOKEN_TYPE", raw))?,
            None => TokenType::default(),
        };

        let env = match lookup("KOOK_ENV") {
            Some(raw) => raw
                .parse()
                .map_err(|()| ConfigError::InvalidValue("KOOK_ENV", raw))?,
            None => Environment::default(),
        };

        Ok(Self {
            env,
            token,
            token_type,
            http: HttpSettings {
                base_url: lookup("KOOK_BASE_URL").unwrap_or_else(default_base_url),
                timeout: Duration::from_secs(parse_or(
                    &lookup,
                    "KOOK_REQUEST_TIMEOUT_SECS",
                    default_request_timeout_secs(),
                )?),
                user_agent: lookup("KOOK_USER_AGENT").unwrap_or_else(default_user_agent),
            },
            gateway: GatewaySettings {
                compress: parse_or(&lookup, "KOOK_GATEWAY_COMPRESS", false)?,
                heartbeat_interval: Duration::from_secs(parse_or(
                    &lookup,
                    "KOOK_HEARTBEAT_INTERVAL_SECS",
                    default_heartbeat_interval_secs(),
                )?),
                reconnect_max_attempts: parse_or(
                    &lookup,
                    "KOOK_RECONNECT_MAX_ATTEMPTS",
                    default_reconnect_max_attempts(),
                )?,
                reconnect_delay: Duration::from_secs(parse_or(
                    &lookup,
                    "KOOK_RECONNECT_DELAY_SECS",
                    default_reconnect_delay_secs(),
                )?),
            },
            webhook: WebhookSettings {
                verify_token: lookup("KOOK_VERIFY_TOKEN").filter(|t| !t.is_empty()),
                addr: parse_or(&lookup, "KOOK_WEBHOOK_ADDR", default_webhook_addr())?,
                path: lookup("KOOK_WEBHOOK_PATH").unwrap_or_else(default_webhook_path),
            },
        })
    }

    /// `Authorization` header value for this credential
    #[must_use]
    pub fn authorization(&self) -> String {
        self.token_type.authorization(&self.token)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
