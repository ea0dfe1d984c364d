//! One live connection: upgrade, handshake, and the reader and heartbeat tasks

use super::gateway_session::Inner;
use crate::connection::{decode_message, FrameSender, FrameWriter, Inbound};
use crate::error::{GatewayError, GatewayResult};
use crate::heartbeat::{run_heartbeat, HeartbeatExit, HeartbeatMonitor};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::StreamExt;
use kook_core::{GatewayFrame, SignalKind};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = FrameWriter<SplitSink<WsStream, Message>>;
type WsReader = SplitStream<WsStream>;

/// Requests from link tasks to the supervisor, tagged with the link generation
#[derive(Debug)]
pub(super) enum Control {
    ConnectionLost { generation: u64, reason: String },
    ReconnectRequested { generation: u64 },
    HeartbeatFailed { generation: u64 },
}

impl Control {
    pub(super) const fn generation(&self) -> u64 {
        match self {
            Self::ConnectionLost { generation, .. }
            | Self::ReconnectRequested { generation }
            | Self::HeartbeatFailed { generation } => *generation,
        }
    }
}

/// What the reader does after handling a frame
enum Flow {
    Continue,
    Reconnect,
}

pub(super) struct Link {
    generation: u64,
    writer: Arc<WsWriter>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Link {
    pub(super) const fn generation(&self) -> u64 {
        self.generation
    }

    /// Stop the link tasks and close the socket
    pub(super) async fn shutdown(self) {
        self.cancel.cancel();
        self.writer.close().await;
        for task in self.tasks {
            task.abort();
        }
        tracing::debug!(generation = self.generation, "Link shut down");
    }
}

/// Open a connection and complete the handshake
///
/// With `resume` set and a known session id, a resume request is sent first
/// and either a resume-ack or a fresh handshake completes the exchange.
pub(super) async fn open(inner: &Arc<Inner>, resume: bool) -> GatewayResult<Link> {
    let config = &inner.config;
    let url = inner.locator.locate(config.compress).await?;

    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| GatewayError::InvalidUrl(format!("{url}: {e}")))?;
    if let Some(authorization) = &config.authorization {
        let value =
            HeaderValue::from_str(authorization).map_err(|_| GatewayError::InvalidAuthorization)?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    tracing::debug!(url = %url, resume, "Opening gateway connection");
    let (stream, _) = tokio::time::timeout(config.connect_timeout, connect_async(request))
        .await
        .map_err(|_| GatewayError::Timeout("connect"))??;

    let (sink, mut reader) = stream.split();
    let writer = Arc::new(FrameWriter::new(sink));
    let sender: Arc<dyn FrameSender> = writer.clone();
    let monitor = Arc::new(HeartbeatMonitor::new());

    let resume_from = if resume {
        inner
            .session_id()
            .map(|session_id| (session_id, inner.last_sequence()))
    } else {
        None
    };

    let exchange = async {
        if let Some((session_id, sn)) = &resume_from {
            sender.send_frame(&GatewayFrame::resume(session_id.clone(), *sn)).await?;
            tracing::info!(session_id = %session_id, sn, "Resume requested");
        }
        handshake(inner, &mut reader, &sender, &monitor, resume_from.is_some()).await
    };
    let outcome = tokio::time::timeout(config.handshake_timeout, exchange)
        .await
        .map_err(|_| GatewayError::Timeout("handshake"))
        .and_then(|result| result);
    if let Err(e) = outcome {
        writer.close().await;
        return Err(e);
    }

    let generation = inner.generation();
    let cancel = inner.shutdown.child_token();

    let reader_task = tokio::spawn(read_loop(
        Arc::clone(inner),
        reader,
        Arc::clone(&sender),
        Arc::clone(&monitor),
        cancel.clone(),
        generation,
    ));
    let heartbeat_task = tokio::spawn(heartbeat_loop(
        Arc::clone(inner),
        sender,
        monitor,
        cancel.clone(),
        generation,
    ));

    Ok(Link {
        generation,
        writer,
        cancel,
        tasks: vec![reader_task, heartbeat_task],
    })
}

async fn handshake(
    inner: &Arc<Inner>,
    reader: &mut WsReader,
    sender: &Arc<dyn FrameSender>,
    monitor: &Arc<HeartbeatMonitor>,
    resuming: bool,
) -> GatewayResult<()> {
    loop {
        let message = match reader.next().await {
            Some(Ok(message)) => message,
            Some(Err(e)) => return Err(e.into()),
            None => return Err(GatewayError::ConnectionClosed),
        };
        let frame = match decode_message(message, inner.config.compress) {
            Ok(Inbound::Frame(frame)) => frame,
            Ok(Inbound::Skip) => continue,
            Ok(Inbound::Closed) => return Err(GatewayError::ConnectionClosed),
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable frame");
                continue;
            }
        };

        match frame.kind() {
            Some(SignalKind::Hello) => {
                let hello = frame.as_hello()?;
                if !hello.is_ok() {
                    return Err(GatewayError::HandshakeRejected {
                        code: hello.code,
                        reason: hello.code_description(),
                    });
                }
                if hello.session_id.is_empty() {
                    return Err(GatewayError::ProtocolViolation(
                        "handshake without a session id".to_string(),
                    ));
                }
                inner.begin_session(hello.session_id, resuming);
                return Ok(());
            }
            Some(SignalKind::ResumeAck) if resuming => {
                inner.mark_resumed();
                return Ok(());
            }
            Some(SignalKind::Reconnect) => return Err(GatewayError::ReconnectRequested),
            _ => {
                handle_frame(inner, sender, monitor, frame);
            }
        }
    }
}

async fn read_loop(
    inner: Arc<Inner>,
    mut reader: WsReader,
    sender: Arc<dyn FrameSender>,
    monitor: Arc<HeartbeatMonitor>,
    cancel: CancellationToken,
    generation: u64,
) {
    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => return,
            next = reader.next() => next,
        };

        let reason = match next {
            Some(Ok(message)) => match decode_message(message, inner.config.compress) {
                Ok(Inbound::Frame(frame)) => match handle_frame(&inner, &sender, &monitor, frame) {
                    Flow::Continue => continue,
                    Flow::Reconnect => {
                        tracing::info!(generation, "Server requested reconnect");
                        inner.request(Control::ReconnectRequested { generation });
                        return;
                    }
                },
                Ok(Inbound::Skip) => continue,
                Ok(Inbound::Closed) => "closed by server".to_string(),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping undecodable frame");
                    continue;
                }
            },
            Some(Err(e)) => e.to_string(),
            None => "stream ended".to_string(),
        };

        if cancel.is_cancelled() {
            return;
        }
        tracing::warn!(generation, reason = %reason, "Gateway connection lost");
        inner.request(Control::ConnectionLost { generation, reason });
        return;
    }
}

async fn heartbeat_loop(
    inner: Arc<Inner>,
    sender: Arc<dyn FrameSender>,
    monitor: Arc<HeartbeatMonitor>,
    cancel: CancellationToken,
    generation: u64,
) {
    let exit = run_heartbeat(
        sender.as_ref(),
        inner.config.heartbeat,
        &monitor,
        || inner.last_sequence(),
        cancel,
    )
    .await;

    if let HeartbeatExit::ConnectionLost { failures } = exit {
        tracing::warn!(generation, failures, "Heartbeat lost the connection");
        inner.request(Control::HeartbeatFailed { generation });
    }
}

/// Handle a frame that arrives on an established (or establishing) link
fn handle_frame(
    inner: &Arc<Inner>,
    sender: &Arc<dyn FrameSender>,
    monitor: &HeartbeatMonitor,
    frame: GatewayFrame,
) -> Flow {
    let Some(kind) = frame.kind() else {
        tracing::warn!(signal = frame.s, "Ignoring unknown signal");
        return Flow::Continue;
    };

    match kind {
        SignalKind::Event => {
            if let Some(sn) = frame.sn {
                inner.record_sequence(sn);
            }
            match frame.as_event() {
                Ok(event) => {
                    tracing::trace!(sn = ?frame.sn, event_type = %event.event_type, "Event received");
                    inner.dispatcher.dispatch(event);
                }
                Err(e) => tracing::warn!(sn = ?frame.sn, error = %e, "Dropping undecodable event"),
            }
        }
        SignalKind::Ping => {
            let sn = frame.heartbeat_sn();
            let sender = Arc::clone(sender);
            tokio::spawn(async move {
                if let Err(e) = sender.send_frame(&GatewayFrame::pong(sn)).await {
                    tracing::debug!(error = %e, "Pong send failed");
                }
            });
        }
        SignalKind::Pong => {
            monitor.reset();
            tracing::trace!(sn = frame.heartbeat_sn(), "Pong received");
        }
        SignalKind::Hello => {
            let violation = GatewayError::ProtocolViolation("handshake on an established session".into());
            tracing::warn!(error = %violation, "Ignoring handshake");
        }
        SignalKind::Resume => {
            tracing::warn!("Ignoring client-only resume signal from server");
        }
        SignalKind::ResumeAck => {
            tracing::debug!("Ignoring unsolicited resume ack");
        }
        SignalKind::Reconnect => return Flow::Reconnect,
    }
    Flow::Continue
}
