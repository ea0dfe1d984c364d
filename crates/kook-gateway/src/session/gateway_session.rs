//! Gateway session lifecycle
//!
//! A session owns at most one live link at a time. Link tasks never reconnect
//! on their own: they report a [`Control`] tagged with their generation to a
//! single supervisor task, which drops reports from retired links and runs the
//! reconnect loop under the lifecycle lock. `close()` cancels the shutdown
//! token first, so every pending delay, connection attempt and link task
//! observes it without waiting for the lock.

use super::config::SessionConfig;
use super::link::{self, Control, Link};
use super::notice::SessionNotice;
use crate::connection::{AtomicConnectionState, ConnectionState};
use crate::error::{GatewayError, GatewayResult};
use crate::locator::GatewayLocator;
use kook_core::{Event, EventDispatcher, EventType, HandlerResult};
use parking_lot::RwLock;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A long-lived client session on the streaming gateway
pub struct GatewaySession {
    inner: Arc<Inner>,
}

pub(super) struct Inner {
    pub(super) config: SessionConfig,
    pub(super) locator: Arc<dyn GatewayLocator>,
    pub(super) dispatcher: Arc<EventDispatcher>,
    pub(super) shutdown: CancellationToken,
    state: AtomicConnectionState,
    last_sequence: AtomicU64,
    session_id: RwLock<Option<String>>,
    generation: AtomicU64,
    notices: broadcast::Sender<SessionNotice>,
    control_tx: mpsc::UnboundedSender<Control>,
    control_rx: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<Control>>>,
    lifecycle: Mutex<Lifecycle>,
}

#[derive(Default)]
struct Lifecycle {
    link: Option<Link>,
    supervisor: Option<JoinHandle<()>>,
}

impl GatewaySession {
    pub fn new(
        locator: Arc<dyn GatewayLocator>,
        dispatcher: Arc<EventDispatcher>,
        config: SessionConfig,
    ) -> Self {
        let (notices, _) = broadcast::channel(config.notice_capacity.max(1));
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        Self {
            inner: Arc::new(Inner {
                config,
                locator,
                dispatcher,
                shutdown: CancellationToken::new(),
                state: AtomicConnectionState::default(),
                last_sequence: AtomicU64::new(0),
                session_id: RwLock::new(None),
                generation: AtomicU64::new(0),
                notices,
                control_tx,
                control_rx: parking_lot::Mutex::new(Some(control_rx)),
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        }
    }

    /// Register an event handler on the session's dispatcher
    pub fn on_event<F, Fut>(&self, event_type: EventType, handler: F)
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.inner.dispatcher.on_event(event_type, handler);
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.inner.dispatcher
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.load()
    }

    /// Session id from the most recent handshake
    pub fn session_id(&self) -> Option<String> {
        self.inner.session_id()
    }

    /// Highest event sequence processed in the current session
    pub fn last_sequence(&self) -> u64 {
        self.inner.last_sequence()
    }

    pub fn notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.inner.notices.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Establish a session, retrying per the reconnect policy
    ///
    /// Returns once the handshake has completed. Calling it on a connected
    /// session is a no-op.
    pub async fn connect(&self) -> GatewayResult<()> {
        let inner = &self.inner;
        if inner.shutdown.is_cancelled() {
            return Err(GatewayError::Closed);
        }

        let mut lifecycle = inner.lifecycle.lock().await;
        if lifecycle.link.is_some() {
            return Ok(());
        }

        let policy = inner.config.reconnect;
        let mut last_error = None;

        for attempt in 1..=policy.max_attempts {
            if !inner.pause(policy.delay_before(attempt)).await {
                inner.set_state(ConnectionState::Disconnected);
                return Err(GatewayError::Closed);
            }

            inner.set_state(ConnectionState::Connecting);
            match inner.open_link(false).await {
                Ok(link) => {
                    inner.install(&mut lifecycle, link);
                    return Ok(());
                }
                Err(GatewayError::Closed) => {
                    inner.set_state(ConnectionState::Disconnected);
                    return Err(GatewayError::Closed);
                }
                Err(e) if !e.is_retryable() => {
                    inner.set_state(ConnectionState::Disconnected);
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        error = %e,
                        "Gateway connection attempt failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        inner.set_state(ConnectionState::Disconnected);
        Err(GatewayError::ConnectionExhausted {
            attempts: policy.max_attempts,
            last: Box::new(last_error.unwrap_or(GatewayError::ConnectionClosed)),
        })
    }

    /// Replace the current link with one that resumes the existing session
    ///
    /// A single attempt; falls back to a fresh session if the server answers
    /// with a new handshake.
    pub async fn resume(&self) -> GatewayResult<()> {
        let inner = &self.inner;
        if inner.shutdown.is_cancelled() {
            return Err(GatewayError::Closed);
        }

        let mut lifecycle = inner.lifecycle.lock().await;
        if inner.session_id().is_none() {
            return Err(GatewayError::ProtocolViolation(
                "no session to resume".to_string(),
            ));
        }

        inner.retire(&mut lifecycle).await;
        inner.set_state(ConnectionState::Resuming);
        match inner.open_link(true).await {
            Ok(link) => {
                inner.install(&mut lifecycle, link);
                Ok(())
            }
            Err(e) => {
                inner.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    /// Close the session for good
    ///
    /// Pending reconnect delays and attempts are abandoned. The session
    /// cannot be reconnected afterwards.
    pub async fn close(&self) {
        let inner = &self.inner;
        inner.shutdown.cancel();

        let mut lifecycle = inner.lifecycle.lock().await;
        inner.retire(&mut lifecycle).await;
        if let Some(supervisor) = lifecycle.supervisor.take() {
            supervisor.abort();
        }
        inner.set_state(ConnectionState::Disconnected);
        tracing::info!("Gateway session closed");
    }
}

impl Drop for GatewaySession {
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
    }
}

impl std::fmt::Debug for GatewaySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySession")
            .field("state", &self.state())
            .field("session_id", &self.session_id())
            .field("last_sequence", &self.last_sequence())
            .finish()
    }
}

impl Inner {
    pub(super) fn session_id(&self) -> Option<String> {
        self.session_id.read().clone()
    }

    pub(super) fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::SeqCst)
    }

    pub(super) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Advance the sequence; it never moves backwards within a session
    pub(super) fn record_sequence(&self, sn: u64) {
        let previous = self.last_sequence.fetch_max(sn, Ordering::SeqCst);
        if sn <= previous {
            tracing::debug!(sn, last_sequence = previous, "Out-of-order or duplicate event");
        }
    }

    /// A successful handshake starts a new session and resets the sequence
    pub(super) fn begin_session(&self, session_id: String, resuming: bool) {
        let previous = self.session_id.write().replace(session_id.clone());
        self.last_sequence.store(0, Ordering::SeqCst);

        if resuming {
            tracing::warn!(
                previous = ?previous,
                session_id = %session_id,
                "Resume rejected, starting a fresh session"
            );
            self.notify(SessionNotice::SessionReset {
                previous,
                session_id,
            });
        } else {
            tracing::info!(session_id = %session_id, "Gateway session established");
            self.notify(SessionNotice::Connected { session_id });
        }
    }

    pub(super) fn mark_resumed(&self) {
        let session_id = self.session_id().unwrap_or_default();
        let sn = self.last_sequence();
        tracing::info!(session_id = %session_id, sn, "Gateway session resumed");
        self.notify(SessionNotice::Resumed { session_id, sn });
    }

    pub(super) fn request(&self, control: Control) {
        // Only fails once the supervisor has stopped, i.e. after close
        let _ = self.control_tx.send(control);
    }

    fn notify(&self, notice: SessionNotice) {
        let _ = self.notices.send(notice);
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.swap(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Gateway state changed");
            self.notify(SessionNotice::StateChanged {
                from: previous,
                to: state,
            });
        }
    }

    /// Sleep unless shut down first; returns false on shutdown
    async fn pause(&self, delay: Duration) -> bool {
        if self.shutdown.is_cancelled() {
            return false;
        }
        if delay.is_zero() {
            return true;
        }
        tokio::select! {
            () = self.shutdown.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        }
    }

    /// One connection attempt, abandoned as soon as the session shuts down
    async fn open_link(self: &Arc<Self>, resume: bool) -> GatewayResult<Link> {
        tokio::select! {
            () = self.shutdown.cancelled() => Err(GatewayError::Closed),
            result = link::open(self, resume) => result,
        }
    }

    fn install(self: &Arc<Self>, lifecycle: &mut Lifecycle, link: Link) {
        tracing::debug!(generation = link.generation(), "Link installed");
        lifecycle.link = Some(link);
        self.set_state(ConnectionState::Connected);

        if lifecycle.supervisor.is_none() {
            if let Some(rx) = self.control_rx.lock().take() {
                lifecycle.supervisor = Some(tokio::spawn(supervise(Arc::clone(self), rx)));
            }
        }
    }

    /// Tear down the current link; reports from it become stale
    async fn retire(&self, lifecycle: &mut Lifecycle) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(link) = lifecycle.link.take() {
            link.shutdown().await;
        }
    }

    async fn recover(self: &Arc<Self>, control: Control) {
        let mut lifecycle = self.lifecycle.lock().await;
        if self.shutdown.is_cancelled() || control.generation() != self.generation() {
            return;
        }

        match &control {
            Control::ConnectionLost { reason, .. } => {
                tracing::warn!(reason = %reason, "Recovering lost gateway connection");
            }
            Control::ReconnectRequested { .. } => {
                tracing::info!("Reconnecting at server request");
            }
            Control::HeartbeatFailed { .. } => {
                tracing::warn!("Recovering after heartbeat failures");
            }
        }

        self.retire(&mut lifecycle).await;

        let policy = self.config.reconnect;
        for attempt in 1..=policy.max_attempts {
            if !self.pause(policy.delay_before(attempt)).await {
                return;
            }

            let resume = self.session_id().is_some();
            self.set_state(if resume {
                ConnectionState::Resuming
            } else {
                ConnectionState::Connecting
            });

            match self.open_link(resume).await {
                Ok(link) => {
                    self.install(&mut lifecycle, link);
                    return;
                }
                Err(GatewayError::Closed) => return,
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        error = %e,
                        "Reconnect attempt failed"
                    );
                }
            }
        }

        self.set_state(ConnectionState::Disconnected);
        let exhausted = GatewayError::ReconnectExhausted {
            attempts: policy.max_attempts,
        };
        tracing::error!(error = %exhausted, "Gateway session gave up reconnecting");
        self.notify(SessionNotice::ReconnectExhausted {
            attempts: policy.max_attempts,
        });
    }
}

/// Serializes recovery: one reconnect loop at a time, stale reports ignored
async fn supervise(inner: Arc<Inner>, mut rx: mpsc::UnboundedReceiver<Control>) {
    loop {
        let control = tokio::select! {
            () = inner.shutdown.cancelled() => break,
            control = rx.recv() => match control {
                Some(control) => control,
                None => break,
            },
        };

        if control.generation() != inner.generation() {
            tracing::debug!(
                generation = control.generation(),
                current = inner.generation(),
                "Ignoring report from retired link"
            );
            continue;
        }
        inner.recover(control).await;
    }
    tracing::debug!("Gateway supervisor stopped");
}
