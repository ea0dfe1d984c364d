//! # kook-webhook
//!
//! Push-mode alternative to the gateway session: an HTTP endpoint that
//! authenticates callbacks and feeds their events to an [`EventDispatcher`].
//!
//! [`EventDispatcher`]: kook_core::EventDispatcher

pub mod error;
pub mod handler;
pub mod server;
pub mod verify;

pub use error::{WebhookError, WebhookResult};
pub use handler::{WebhookState, NONCE_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};
pub use server::{router, run};
pub use verify::{SignatureVerifier, MAX_REQUEST_AGE_SECS};
