//! Chunked binary transfer with byte-budget backpressure.
//!
//! A payload is pushed as a sequence of bounded frames, each tagged with
//! its stream id and byte offset. Every pass budgets against the
//! connection's outstanding bytes: whatever does not fit is deferred, and
//! [`ChunkSender::stream_all`] re-polls on a fixed interval until the
//! payload is fully queued. Cooperative backpressure; no thread ever
//! blocks.

use tracing::{debug, trace};

use synccast_protocol::{encode_frame, ChunkHeader, CHUNK_HEADER_LEN};

use crate::config::TransferConfig;
use crate::connection::Connection;
use crate::error::{ClientError, ClientResult};

/// Splits payloads into chunk frames and paces them against the
/// connection's write buffer.
#[derive(Debug, Clone, Default)]
pub struct ChunkSender {
    config: TransferConfig,
}

impl ChunkSender {
    pub fn new(config: TransferConfig) -> Self {
        Self { config }
    }

    /// One backpressure pass. Sends at most `byte_cap - buffered` payload
    /// bytes, sliced into frames no larger than the frame cap, and returns
    /// how many payload bytes went out; the caller owns the deferred rest.
    ///
    /// A zero return means the budget was exhausted before anything could
    /// be sent; no zero-length frame is ever produced.
    pub fn send_pass(
        &self,
        conn: &dyn Connection,
        payload: &[u8],
        stream_id: u32,
        offset: u32,
    ) -> ClientResult<usize> {
        let outstanding = conn.buffered_bytes();
        let capacity = self.config.byte_cap.saturating_sub(outstanding);
        if capacity == 0 || payload.is_empty() {
            return Ok(0);
        }

        let head = &payload[..payload.len().min(capacity)];
        let frame_payload = self.config.max_frame_size - CHUNK_HEADER_LEN;
        let mut sent = 0usize;
        for slice in head.chunks(frame_payload) {
            let header = ChunkHeader {
                stream_id,
                offset: offset + sent as u32,
            };
            conn.send_binary(encode_frame(header, slice)?)?;
            sent += slice.len();
            trace!(stream_id, offset = header.offset, len = slice.len(), "chunk sent");
        }
        Ok(sent)
    }

    /// Drives [`send_pass`](Self::send_pass) until the payload is fully
    /// queued, sleeping the poll interval whenever a pass left a
    /// remainder. Offsets continue from the cumulative bytes sent, so a
    /// stream resumed after backpressure picks up at the right byte
    /// position. Ends early with `Disconnected` if the connection closes.
    pub async fn stream_all(
        &self,
        conn: &dyn Connection,
        payload: &[u8],
        stream_id: u32,
        offset: u32,
    ) -> ClientResult<()> {
        let mut done = 0usize;
        while done < payload.len() {
            if !conn.is_ready() {
                return Err(ClientError::Disconnected);
            }
            let sent = self.send_pass(conn, &payload[done..], stream_id, offset + done as u32)?;
            done += sent;
            if done < payload.len() {
                debug!(
                    stream_id,
                    sent = done,
                    remaining = payload.len() - done,
                    "transfer deferred, waiting for budget"
                );
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }
        Ok(())
    }
}
