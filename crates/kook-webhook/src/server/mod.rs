//! Push endpoint server setup

use std::sync::Arc;

use axum::{routing::post, Router};
use kook_common::WebhookSettings;
use kook_core::EventDispatcher;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{WebhookError, WebhookResult};
use crate::handler::{receive, WebhookState};

/// Build the push endpoint router; other methods on `path` get 405
pub fn router(state: WebhookState, path: &str) -> Router {
    Router::new()
        .route(path, post(receive))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the listener fails
pub async fn run(settings: &WebhookSettings, dispatcher: Arc<EventDispatcher>) -> WebhookResult<()> {
    let state = WebhookState::new(settings.verify_token.clone(), dispatcher);
    if !state.verifies_signatures() {
        tracing::warn!("No verify token configured, push requests are not authenticated");
    }
    let app = router(state, &settings.path);

    let listener = TcpListener::bind(settings.addr)
        .await
        .map_err(|source| WebhookError::Bind {
            addr: settings.addr,
            source,
        })?;

    info!(addr = %settings.addr, path = %settings.path, "Push endpoint listening");
    axum::serve(listener, app).await.map_err(WebhookError::Serve)
}
