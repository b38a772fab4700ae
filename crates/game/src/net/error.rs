use std::io;

use rkyv::rancor;

use super::frame::MAX_FRAME_LEN;

/// Connection-level failure. Always session-ending: the owner closes the
/// transport and resets the session to `Disconnected`.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("transport is not connected")]
    NotConnected,
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame length {len} outside 1..={max}", max = MAX_FRAME_LEN)]
    FrameLength { len: usize },
    #[error("payload of {0} bytes is too short for a message envelope")]
    Truncated(usize),
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
}

impl ProtocolError {
    /// Framing violations poison the byte stream; body decode failures only
    /// lose the one message.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProtocolError::FrameLength { .. })
    }
}
