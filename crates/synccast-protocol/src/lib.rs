//! Wire types for the synccast remote-playback protocol.
//!
//! One ordered transport carries three message shapes, and this crate
//! defines all of them without doing any IO:
//!
//! - JSON-RPC 2.0 text envelopes ([`Envelope`]): correlated calls,
//!   fire-and-forget notifications and broadcast fan-out.
//! - Binary chunk frames ([`ChunkHeader`]): an 8-byte stream-id/offset
//!   header followed by raw payload bytes.
//! - Partial-update paths ([`path`]): a dotted/bracket-indexed address
//!   mini-language (`"a.b[2].c"`) for patching a JSON document in place
//!   instead of retransmitting it.
//!
//! # Example
//!
//! ```rust
//! use synccast_protocol::{Envelope, Method, RequestEnvelope};
//!
//! let call = RequestEnvelope::call(Method::Get, serde_json::json!(["playing"]), 1);
//! let text = call.encode().unwrap();
//! let decoded: Envelope = serde_json::from_str(&text).unwrap();
//! assert!(matches!(decoded, Envelope::Request(_)));
//! ```

mod chunk;
mod envelope;
mod error;
pub mod path;
mod state;

pub use chunk::{ChunkHeader, decode_frame, encode_frame, CHUNK_HEADER_LEN, MAX_FRAME_SIZE};
pub use envelope::{
    CallId, Envelope, Method, NotifyAction, NotifyParams, RequestEnvelope, ResponseEnvelope,
    RpcError, JSONRPC_VERSION,
};
pub use error::{ProtocolError, ProtocolResult};
pub use path::{apply_at, get_at, parse_path, Segment};
pub use state::{BufferWindow, InstantFile, MediaSource, PlaybackState};
