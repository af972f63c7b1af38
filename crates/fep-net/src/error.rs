use std::fmt;

use crate::state::EndpointState;

/// Errors raised by the dual-channel endpoint (§7 "ConnectionLost", "ParseError").
#[derive(Debug)]
pub enum NetError {
    /// The underlying TCP connect/accept/read/write failed.
    Io(std::io::Error),
    /// A frame could not be decoded once received.
    Codec(fep_codec::ParseError),
    /// A message could not be encoded before being sent.
    Encode(fep_codec::EncodeError),
    /// The length prefix itself was malformed or out of range.
    Framing(fep_codec::FieldError),
    /// A state transition was attempted that the endpoint state machine forbids.
    IllegalTransition { from: EndpointState, to: EndpointState },
    /// An operation requires a fully connected endpoint but it isn't one.
    NotConnected,
    /// The endpoint is shutting down or already closed.
    Closed,
    /// A dual-port endpoint's SEND/RECEIVE sockets disagree about the peer
    /// (only meaningful for the server role's client directory).
    MismatchedChannels,
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::Io(e) => write!(f, "I/O error: {e}"),
            NetError::Codec(e) => write!(f, "decode error: {e}"),
            NetError::Encode(e) => write!(f, "encode error: {e}"),
            NetError::Framing(e) => write!(f, "framing error: {e}"),
            NetError::IllegalTransition { from, to } => {
                write!(f, "illegal endpoint state transition: {from:?} -> {to:?}")
            }
            NetError::NotConnected => write!(f, "endpoint is not connected"),
            NetError::Closed => write!(f, "endpoint is closed"),
            NetError::MismatchedChannels => write!(f, "SEND and RECEIVE sockets resolved to different peers"),
        }
    }
}

impl std::error::Error for NetError {}

impl From<std::io::Error> for NetError {
    fn from(e: std::io::Error) -> Self {
        NetError::Io(e)
    }
}

impl From<fep_codec::ParseError> for NetError {
    fn from(e: fep_codec::ParseError) -> Self {
        NetError::Codec(e)
    }
}

impl From<fep_codec::EncodeError> for NetError {
    fn from(e: fep_codec::EncodeError) -> Self {
        NetError::Encode(e)
    }
}

impl From<fep_codec::FieldError> for NetError {
    fn from(e: fep_codec::FieldError) -> Self {
        NetError::Framing(e)
    }
}
