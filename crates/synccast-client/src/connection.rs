//! Connection adapter boundary.
//!
//! The transport itself (socket connect/close, frame delimiting) lives
//! outside this crate. The core only needs a readiness predicate, an
//! outstanding-byte counter for backpressure, and ordered text/binary
//! sends; [`Connection`] is that seam.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::mpsc;

use crate::error::{ClientError, ClientResult};

/// A single frame as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Send side of the transport. Frames handed to `send_*` are delivered to
/// the peer in call order; that ordering guarantee is the transport's, not
/// reimplemented here.
pub trait Connection: Send + Sync {
    /// True when the transport is open and accepting writes.
    fn is_ready(&self) -> bool;

    /// Bytes queued on the transport but not yet flushed to the peer.
    /// The chunking engine budgets against this.
    fn buffered_bytes(&self) -> usize;

    fn send_text(&self, text: String) -> ClientResult<()>;

    fn send_binary(&self, bytes: Vec<u8>) -> ClientResult<()>;

    fn close(&self);
}

/// In-memory connection half: frames sent through it appear on the paired
/// receiver. Useful for loopback wiring and tests.
///
/// The outstanding-byte counter grows with every send and shrinks when the
/// consumer calls [`PairedConnection::note_flushed`], which stands in for
/// the transport draining its write buffer.
pub struct PairedConnection {
    ready: AtomicBool,
    buffered: AtomicUsize,
    outbound: mpsc::UnboundedSender<Frame>,
}

impl PairedConnection {
    /// Creates a connected pair: the connection half and the receiver the
    /// peer reads frames from.
    pub fn pair() -> (Arc<Self>, mpsc::UnboundedReceiver<Frame>) {
        let (outbound, inbound) = mpsc::unbounded_channel();
        let conn = Arc::new(Self {
            ready: AtomicBool::new(true),
            buffered: AtomicUsize::new(0),
            outbound,
        });
        (conn, inbound)
    }

    /// Marks the transport ready or not ready.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Records that the transport flushed `bytes` to the peer.
    pub fn note_flushed(&self, bytes: usize) {
        let _ = self
            .buffered
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_sub(bytes))
            });
    }

    /// Pins the outstanding-byte counter to an exact value. Test hook for
    /// exercising backpressure without a real transport.
    pub fn set_buffered(&self, bytes: usize) {
        self.buffered.store(bytes, Ordering::SeqCst);
    }

    fn push(&self, frame: Frame, len: usize) -> ClientResult<()> {
        if !self.is_ready() {
            return Err(ClientError::Disconnected);
        }
        self.buffered.fetch_add(len, Ordering::SeqCst);
        self.outbound
            .send(frame)
            .map_err(|_| ClientError::Disconnected)
    }
}

impl Connection for PairedConnection {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn buffered_bytes(&self) -> usize {
        self.buffered.load(Ordering::SeqCst)
    }

    fn send_text(&self, text: String) -> ClientResult<()> {
        let len = text.len();
        self.push(Frame::Text(text), len)
    }

    fn send_binary(&self, bytes: Vec<u8>) -> ClientResult<()> {
        let len = bytes.len();
        self.push(Frame::Binary(bytes), len)
    }

    fn close(&self) {
        self.ready.store(false, Ordering::SeqCst);
    }
}
