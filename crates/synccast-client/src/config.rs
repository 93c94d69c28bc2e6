//! Client configuration.
//!
//! Plain values with sensible defaults; loading them from disk or flags is
//! the embedding application's business.

use std::time::Duration;

use synccast_protocol::MAX_FRAME_SIZE;

/// Tuning for the chunked transfer engine.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Largest single wire frame, chunk header included.
    pub max_frame_size: usize,
    /// Outstanding-byte cap on the connection; a pass sends at most
    /// `cap - buffered` payload bytes.
    pub byte_cap: usize,
    /// Delay between backpressure polls when a pass was deferred.
    pub poll_interval: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
            byte_cap: 4_000_000,
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl TransferConfig {
    /// Builder: set the frame size cap.
    pub fn with_max_frame_size(mut self, bytes: usize) -> Self {
        self.max_frame_size = bytes.min(MAX_FRAME_SIZE);
        self
    }

    /// Builder: set the outstanding-byte cap.
    pub fn with_byte_cap(mut self, bytes: usize) -> Self {
        self.byte_cap = bytes;
        self
    }

    /// Builder: set the backpressure poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Configuration for a playback session.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Allowed divergence (seconds) between local position and the
    /// host-broadcast position before forced correction. Keeps normal
    /// clock drift from causing constant micro-seeks.
    pub max_gap: f64,
    /// Bytes fetched per buffer fill on the host side.
    pub buffer_size: u64,
    /// Optional per-call deadline for `invoke`. Off by default; connection
    /// loss is then the only forced settlement.
    pub request_timeout: Option<Duration>,
    /// Chunked transfer tuning.
    pub transfer: TransferConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_gap: 1.0,
            buffer_size: 2_000_000,
            request_timeout: None,
            transfer: TransferConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Builder: set the sync correction tolerance.
    pub fn with_max_gap(mut self, seconds: f64) -> Self {
        self.max_gap = seconds.max(0.0);
        self
    }

    /// Builder: set the per-fill buffer size.
    pub fn with_buffer_size(mut self, bytes: u64) -> Self {
        self.buffer_size = bytes;
        self
    }

    /// Builder: set a per-call timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Builder: set the transfer tuning.
    pub fn with_transfer(mut self, transfer: TransferConfig) -> Self {
        self.transfer = transfer;
        self
    }
}
