//! Gateway bot entry point
//!
//! Run with:
//! ```bash
//! KOOK_TOKEN=... cargo run -p kook-gateway
//! ```
//!
//! Connects to the streaming gateway and logs incoming messages until
//! interrupted.

use anyhow::Context;
use kook_common::{init_tracing, ClientConfig};
use kook_core::{EventDispatcher, EventType};
use kook_gateway::{GatewaySession, SessionConfig, SessionNotice};
use kook_http::HttpClient;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(config.env);

    if let Err(e) = run(config).await {
        error!(error = %e, "Gateway client failed");
        std::process::exit(1);
    }
}

async fn run(config: ClientConfig) -> anyhow::Result<()> {
    info!(
        env = ?config.env,
        base_url = %config.http.base_url,
        compress = config.gateway.compress,
        "Configuration loaded"
    );

    let client = HttpClient::from_config(&config).context("building API client")?;
    let dispatcher = Arc::new(EventDispatcher::new());

    for event_type in [EventType::TEXT, EventType::KMARKDOWN] {
        dispatcher.on_event(event_type, |event| async move {
            info!(
                channel = ?event.channel_type,
                target_id = %event.target_id,
                author_id = %event.author_id,
                content = %event.content,
                "Message received"
            );
            Ok(())
        });
    }
    dispatcher.on_event(EventType::SYSTEM, |event| async move {
        info!(kind = ?event.system_kind(), target_id = %event.target_id, "System event");
        Ok(())
    });

    let session = GatewaySession::new(
        Arc::new(client),
        dispatcher,
        SessionConfig::from_client_config(&config),
    );
    let mut notices = session.notices();

    session.connect().await.context("connecting to gateway")?;
    info!(session_id = ?session.session_id(), "Gateway connected, press Ctrl+C to stop");

    let outcome = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("listening for shutdown signal")?;
                info!("Shutdown signal received");
                break Ok(());
            }
            notice = notices.recv() => match notice {
                Ok(SessionNotice::ReconnectExhausted { attempts }) => {
                    break Err(anyhow::anyhow!("gateway unreachable after {attempts} reconnect attempts"));
                }
                Ok(notice) => tracing::debug!(notice = ?notice, "Session notice"),
                Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "Notice stream lagged"),
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    session.close().await;
    outcome
}
