//! Inbound message decoding
//!
//! Compressed sessions deliver zlib-compressed binary frames; text frames are
//! always plain JSON.

use crate::error::{GatewayError, GatewayResult};
use flate2::read::ZlibDecoder;
use kook_core::GatewayFrame;
use std::io::Read;
use tokio_tungstenite::tungstenite::Message;

/// What the reader should do with one transport message
#[derive(Debug)]
pub enum Inbound {
    Frame(GatewayFrame),
    /// Transport-level control traffic, nothing to do
    Skip,
    /// The server closed the stream
    Closed,
}

/// Inflate a zlib stream
pub fn inflate(bytes: &[u8]) -> GatewayResult<Vec<u8>> {
    let mut out = Vec::with_capacity(bytes.len() * 4);
    ZlibDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(GatewayError::DecompressionFailure)?;
    Ok(out)
}

/// Decode one transport message into a frame
///
/// Errors mean the single message is unusable; the connection itself is fine.
pub fn decode_message(message: Message, compressed: bool) -> GatewayResult<Inbound> {
    match message {
        Message::Text(text) => Ok(Inbound::Frame(GatewayFrame::from_json(&text)?)),
        Message::Binary(bytes) if compressed => {
            let raw = inflate(&bytes)?;
            Ok(Inbound::Frame(GatewayFrame::from_slice(&raw)?))
        }
        Message::Binary(bytes) => Ok(Inbound::Frame(GatewayFrame::from_slice(&bytes)?)),
        Message::Close(_) => Ok(Inbound::Closed),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Ok(Inbound::Skip),
    }
}
