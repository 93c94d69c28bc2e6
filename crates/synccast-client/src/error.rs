//! Client error types.

use std::fmt;

use synccast_protocol::{ProtocolError, RpcError};

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// The connection is not in the ready state; never retried
    /// automatically.
    Disconnected,
    /// The peer reported a failure for a specific call.
    Rpc(RpcError),
    /// Wire-level encode/decode failure (bad path, oversized frame, bad
    /// JSON).
    Protocol(ProtocolError),
    /// A call exceeded its configured timeout.
    Timeout(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "connection is not ready"),
            Self::Rpc(err) => write!(f, "{}", err),
            Self::Protocol(err) => write!(f, "protocol error: {}", err),
            Self::Timeout(msg) => write!(f, "timeout: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rpc(err) => Some(err),
            Self::Protocol(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        Self::Protocol(err)
    }
}

impl From<RpcError> for ClientError {
    fn from(err: RpcError) -> Self {
        Self::Rpc(err)
    }
}
