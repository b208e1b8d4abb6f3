use std::fmt;
use std::io;

/// Errors surfaced by framing, the handshake, and connection I/O. Per the
/// taxonomy this crate implements: framing/validation errors are recovered
/// locally (the connection is closed), I/O errors trigger reconnection with
/// backoff, and only bind/connect failures at transport initialization are
/// meant to propagate to a caller.
#[derive(Debug)]
pub enum NetError {
    Framing(String),
    Io(io::Error),
    Handshake(String),
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::Framing(msg) => write!(f, "framing error: {msg}"),
            NetError::Io(e) => write!(f, "i/o error: {e}"),
            NetError::Handshake(msg) => write!(f, "handshake failed: {msg}"),
        }
    }
}

impl std::error::Error for NetError {}

impl From<io::Error> for NetError {
    fn from(e: io::Error) -> Self {
        NetError::Io(e)
    }
}
