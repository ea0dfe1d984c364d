//! Configuration structs

mod app_config;

pub use app_config::{
    ClientConfig, ConfigError, Environment, GatewaySettings, HttpSettings, TokenType,
    WebhookSettings,
};
