//! Binary chunk frame codec.
//!
//! Every binary frame starts with an 8-byte header:
//!
//! ```text
//! +----------------+----------------+------------------+
//! | streamId (4 BE)| offset (4 BE)  |  payload bytes   |
//! +----------------+----------------+------------------+
//! ```
//!
//! The stream id multiplexes independent transfers on one connection; the
//! offset is the payload's byte position inside the source, so a receiver
//! can reassemble chunks delivered out of order.

use crate::error::{ProtocolError, ProtocolResult};

/// Cap on a whole wire frame, header included.
pub const MAX_FRAME_SIZE: usize = 60_000;

/// Length of the chunk header in bytes.
pub const CHUNK_HEADER_LEN: usize = 8;

/// Header prepended to every binary frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub stream_id: u32,
    pub offset: u32,
}

impl ChunkHeader {
    /// Encodes the header into its 8-byte wire form.
    pub fn encode(&self) -> [u8; CHUNK_HEADER_LEN] {
        let mut buf = [0u8; CHUNK_HEADER_LEN];
        buf[0..4].copy_from_slice(&self.stream_id.to_be_bytes());
        buf[4..8].copy_from_slice(&self.offset.to_be_bytes());
        buf
    }
}

/// Builds a complete binary frame: header followed by payload.
///
/// Callers sending more than one frame's worth of data must go through the
/// chunking engine; a single oversized frame is an error here.
pub fn encode_frame(header: ChunkHeader, payload: &[u8]) -> ProtocolResult<Vec<u8>> {
    let size = CHUNK_HEADER_LEN + payload.len();
    if size > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size,
            max: MAX_FRAME_SIZE,
        });
    }
    let mut frame = Vec::with_capacity(size);
    frame.extend_from_slice(&header.encode());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Splits a binary frame into its header and payload.
pub fn decode_frame(frame: &[u8]) -> ProtocolResult<(ChunkHeader, &[u8])> {
    if frame.len() < CHUNK_HEADER_LEN {
        return Err(ProtocolError::TruncatedFrame {
            len: frame.len(),
            header: CHUNK_HEADER_LEN,
        });
    }
    let stream_id = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]);
    let offset = u32::from_be_bytes([frame[4], frame[5], frame[6], frame[7]]);
    Ok((ChunkHeader { stream_id, offset }, &frame[CHUNK_HEADER_LEN..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let header = ChunkHeader {
            stream_id: 3,
            offset: 120_000,
        };
        let frame = encode_frame(header, b"hello").unwrap();
        assert_eq!(frame.len(), CHUNK_HEADER_LEN + 5);

        let (decoded, payload) = decode_frame(&frame).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(payload, b"hello");
    }

    #[test]
    fn header_is_big_endian() {
        let header = ChunkHeader {
            stream_id: 1,
            offset: 0x0102_0304,
        };
        let bytes = header.encode();
        assert_eq!(bytes, [0, 0, 0, 1, 1, 2, 3, 4]);
    }

    #[test]
    fn empty_payload_frame() {
        let header = ChunkHeader {
            stream_id: 9,
            offset: 0,
        };
        let frame = encode_frame(header, &[]).unwrap();
        let (decoded, payload) = decode_frame(&frame).unwrap();
        assert_eq!(decoded, header);
        assert!(payload.is_empty());
    }

    #[test]
    fn oversized_frame_rejected() {
        let header = ChunkHeader {
            stream_id: 1,
            offset: 0,
        };
        let payload = vec![0u8; MAX_FRAME_SIZE];
        let result = encode_frame(header, &payload);
        assert!(matches!(
            result,
            Err(ProtocolError::FrameTooLarge { .. })
        ));

        // Largest payload that still fits.
        let payload = vec![0u8; MAX_FRAME_SIZE - CHUNK_HEADER_LEN];
        assert!(encode_frame(header, &payload).is_ok());
    }

    #[test]
    fn truncated_frame_rejected() {
        let result = decode_frame(&[0, 0, 0]);
        assert!(matches!(
            result,
            Err(ProtocolError::TruncatedFrame { len: 3, header: 8 })
        ));
    }
}
