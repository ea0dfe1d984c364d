//! One physical gateway connection: state, outbound writer and inbound codec

mod codec;
mod state;
mod writer;

pub use codec::{decode_message, inflate, Inbound};
pub use state::{AtomicConnectionState, ConnectionState};
pub use writer::{FrameSender, FrameWriter};
