//! Event dispatcher
//!
//! Routes events to the handlers registered for their type. Each handler
//! invocation runs as its own task so a slow, failing or panicking handler
//! never holds up the caller or the other handlers.

use crate::events::{Event, EventType};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Failure reported by an event handler
pub type HandlerError = anyhow::Error;

/// Result returned by event handlers
pub type HandlerResult = Result<(), HandlerError>;

type Handler = Arc<dyn Fn(Arc<Event>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Registry of event handlers keyed by event type
///
/// Registration is append-only and may happen before or after a session connects.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: RwLock<HashMap<EventType, Vec<Handler>>>,
}

impl EventDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an event type
    ///
    /// Handlers for the same type run in registration order of spawning, but
    /// concurrently, with no ordering guarantee between them.
    pub fn on_event<F, Fut>(&self, event_type: EventType, handler: F)
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |event| handler(event).boxed());
        self.handlers
            .write()
            .entry(event_type)
            .or_default()
            .push(handler);

        tracing::debug!(event_type = %event_type, "Event handler registered");
    }

    /// Number of handlers registered for a type
    #[must_use]
    pub fn handler_count(&self, event_type: EventType) -> usize {
        self.handlers.read().get(&event_type).map_or(0, Vec::len)
    }

    /// Spawn every handler registered for the event's type
    ///
    /// Returns immediately; the returned [`Dispatched`] may be dropped.
    pub fn dispatch(&self, event: Event) -> Dispatched {
        let event_type = event.event_type;
        let handlers = match self.handlers.read().get(&event_type) {
            Some(handlers) => handlers.clone(),
            None => {
                tracing::trace!(event_type = %event_type, "No handlers for event");
                return Dispatched::default();
            }
        };

        let event = Arc::new(event);
        let tasks = handlers
            .into_iter()
            .enumerate()
            .map(|(index, handler)| {
                let event = Arc::clone(&event);
                tokio::spawn(async move {
                    let outcome = AssertUnwindSafe(async move { handler(event).await })
                        .catch_unwind()
                        .await;

                    match outcome {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            tracing::warn!(
                                event_type = %event_type,
                                handler = index,
                                error = %e,
                                "Event handler failed"
                            );
                        }
                        Err(panic) => {
                            tracing::error!(
                                event_type = %event_type,
                                handler = index,
                                panic = %panic_message(panic.as_ref()),
                                "Event handler panicked"
                            );
                        }
                    }
                })
            })
            .collect();

        Dispatched { tasks }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        f.debug_struct("EventDispatcher")
            .field("event_types", &handlers.len())
            .field("handlers", &handlers.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

/// Tasks spawned by one dispatch
#[derive(Debug, Default)]
pub struct Dispatched {
    tasks: Vec<JoinHandle<()>>,
}

impl Dispatched {
    /// Number of handlers spawned
    #[must_use]
    pub fn count(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every spawned handler to finish
    pub async fn join(self) {
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
