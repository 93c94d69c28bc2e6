//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding protocol data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A single binary frame exceeds the frame size cap.
    #[error("frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A binary frame is shorter than the chunk header.
    #[error("truncated chunk frame: {len} bytes (header is {header})")]
    TruncatedFrame { len: usize, header: usize },

    /// Failed to serialize or deserialize JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A path segment does not match the `name` / `name[index]` grammar.
    #[error("invalid path segment {segment:?} in {path:?}")]
    PathParse { path: String, segment: String },

    /// A path parsed but does not resolve inside the document.
    #[error("path {0:?} does not resolve inside the document")]
    PathUnresolved(String),
}
