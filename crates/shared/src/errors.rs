use std::fmt;

/// Raised when a bridge slot's ephemeral acceptor does not receive the
/// matching agent-originated socket within its expiry window.
///
/// Kept as a distinct type (rather than a bare `anyhow::anyhow!`) because
/// the broker needs to tell this case apart from a generic I/O failure: a
/// timeout also closes the control channel, a plain accept error does not.
#[derive(Debug)]
pub struct BridgeTimeout {
    pub bridge_port: u16,
}

impl fmt::Display for BridgeTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bridge slot on port {} expired before the agent connected",
            self.bridge_port
        )
    }
}

impl std::error::Error for BridgeTimeout {}

/// Raised when a 2-byte control message cannot be parsed, carrying the
/// remote address for diagnostics (mirrors how I/O errors on a specific
/// peer are reported elsewhere in this codebase).
#[derive(Debug)]
pub struct ControlProtocolError {
    pub peer: Option<std::net::SocketAddr>,
    pub message: String,
}

impl ControlProtocolError {
    pub fn new(peer: Option<std::net::SocketAddr>, message: impl Into<String>) -> Self {
        ControlProtocolError {
            peer,
            message: message.into(),
        }
    }
}

impl fmt::Display for ControlProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "control protocol error ({:?}): {}", self.peer, self.message)
    }
}

impl std::error::Error for ControlProtocolError {}
