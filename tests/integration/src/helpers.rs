//! Test helpers for integration tests
//!
//! Provides a scripted in-process gateway, a stub API server and polling
//! utilities for asserting on asynchronous session behavior.

use std::io::Write;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::Router;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use futures_util::{SinkExt, StreamExt};
use kook_core::{EventDispatcher, EventType, GatewayFrame, HelloPayload, SignalKind};
use kook_gateway::{GatewayLocator, GatewayResult};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};

/// How long helpers wait for the client before failing a test
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Scripted gateway
// ============================================================================

/// In-process WebSocket gateway; each accepted connection is handed to the test
pub struct MockGateway {
    pub addr: SocketAddr,
    connections: mpsc::UnboundedReceiver<MockConnection>,
    accepted: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl MockGateway {
    /// Bind to an ephemeral port and start accepting
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (tx, connections) = mpsc::unbounded_channel();
        let accepted = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&accepted);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(connection) = MockConnection::accept(stream).await else {
                    continue;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                if tx.send(connection).is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            addr,
            connections,
            accepted,
            handle,
        })
    }

    pub fn url(&self) -> String {
        format!("ws://{}/gateway", self.addr)
    }

    /// Wait for the client's next connection
    pub async fn accept(&mut self) -> Result<MockConnection> {
        tokio::time::timeout(STEP_TIMEOUT, self.connections.recv())
            .await
            .context("timed out waiting for a gateway connection")?
            .context("gateway accept loop stopped")
    }

    /// Whether another connection arrives within `window`
    pub async fn expect_no_connection(&mut self, window: Duration) -> bool {
        tokio::time::timeout(window, self.connections.recv())
            .await
            .is_err()
    }

    /// Connections completed so far
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Stop listening; later connection attempts are refused
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

/// Server side of one client connection
pub struct MockConnection {
    ws: WebSocketStream<TcpStream>,
    /// `Authorization` header sent on the upgrade
    pub authorization: Option<String>,
}

impl MockConnection {
    async fn accept(stream: TcpStream) -> Result<Self> {
        let mut authorization = None;
        let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            authorization = request
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            Ok(response)
        };
        let ws = accept_hdr_async(stream, callback).await?;
        Ok(Self { ws, authorization })
    }

    pub async fn send_frame(&mut self, frame: &GatewayFrame) -> Result<()> {
        self.ws.send(Message::Text(frame.to_json()?)).await?;
        Ok(())
    }

    /// Send a frame as a zlib-compressed binary message
    pub async fn send_compressed(&mut self, frame: &GatewayFrame) -> Result<()> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(frame.to_json()?.as_bytes())?;
        self.ws.send(Message::Binary(encoder.finish()?)).await?;
        Ok(())
    }

    pub async fn send_raw(&mut self, message: Message) -> Result<()> {
        self.ws.send(message).await?;
        Ok(())
    }

    pub async fn send_hello(&mut self, session_id: &str) -> Result<()> {
        self.send_frame(&GatewayFrame::hello(&HelloPayload::new(session_id)))
            .await
    }

    /// Next frame from the client
    pub async fn recv_frame(&mut self) -> Result<GatewayFrame> {
        loop {
            let message = tokio::time::timeout(STEP_TIMEOUT, self.ws.next())
                .await
                .context("timed out waiting for a client frame")?
                .context("client closed the connection")??;
            match message {
                Message::Text(text) => return Ok(GatewayFrame::from_json(&text)?),
                Message::Close(_) => anyhow::bail!("client closed the connection"),
                _ => {}
            }
        }
    }

    /// Next frame of `kind`, skipping anything else (e.g. heartbeats)
    pub async fn expect_signal(&mut self, kind: SignalKind) -> Result<GatewayFrame> {
        loop {
            let frame = self.recv_frame().await?;
            if frame.kind() == Some(kind) {
                return Ok(frame);
            }
        }
    }

    /// Send a close frame and drop the connection
    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}

// ============================================================================
// Locators and event capture
// ============================================================================

/// Fixed URL locator that counts lookups, i.e. connection attempts
#[derive(Debug)]
pub struct CountingLocator {
    url: String,
    calls: AtomicUsize,
}

impl CountingLocator {
    pub fn new(url: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            url: url.into(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GatewayLocator for CountingLocator {
    async fn locate(&self, _compress: bool) -> GatewayResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.url.clone())
    }
}

/// Records the content of every text event a dispatcher delivers
#[derive(Clone, Default)]
pub struct EventLog {
    contents: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    /// Register a recording handler for text events
    pub fn attach(dispatcher: &EventDispatcher) -> Self {
        let log = Self::default();
        let contents = Arc::clone(&log.contents);
        dispatcher.on_event(EventType::TEXT, move |event| {
            let contents = Arc::clone(&contents);
            async move {
                contents.lock().push(event.content.clone());
                Ok(())
            }
        });
        log
    }

    pub fn contents(&self) -> Vec<String> {
        self.contents.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.contents.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Poll `condition` every 10ms until it holds or `STEP_TIMEOUT` elapses
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + STEP_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// An address nothing is listening on
pub async fn closed_port_url() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("ws://{addr}/gateway"))
}

// ============================================================================
// Stub API server
// ============================================================================

/// Stub API server instance that manages lifecycle
pub struct StubApi {
    pub addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl StubApi {
    /// Serve `router` on an ephemeral port
    pub async fn start(router: Router) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        Ok(Self {
            addr,
            _handle: handle,
        })
    }

    /// Base URL for the client; requests land on `/v3/...`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}
