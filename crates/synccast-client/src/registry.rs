//! Pending-call registry.
//!
//! Maps locally-assigned call ids to their waiting callers. Ids come from
//! a monotonic counter starting at 1 and are never reused while the
//! connection lives; the registry is constructed per connection and thrown
//! away on teardown, so reconnects never see stale state.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::warn;

use crate::error::ClientError;

/// How a pending call resolves.
pub type Settlement = Result<Value, ClientError>;

/// Registry of calls awaiting their responses.
#[derive(Debug, Default)]
pub struct RequestRegistry {
    next_id: u64,
    pending: HashMap<u64, oneshot::Sender<Settlement>>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next call id and registers a pending slot for it.
    pub fn register(&mut self) -> (u64, oneshot::Receiver<Settlement>) {
        self.next_id += 1;
        let id = self.next_id;
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        (id, rx)
    }

    /// Settles the pending call for `id` exactly once. A response whose id
    /// has no entry is a data-integrity warning, not a fault: it is logged
    /// and dropped without touching other calls.
    pub fn settle(&mut self, id: u64, outcome: Settlement) {
        match self.pending.remove(&id) {
            Some(tx) => {
                // The caller may have given up (e.g. timeout); that is fine.
                let _ = tx.send(outcome);
            }
            None => warn!(id, "response has no matching pending call, dropping"),
        }
    }

    /// Removes a pending entry without settling it. A response arriving
    /// later is then an unknown correlation.
    pub fn discard(&mut self, id: u64) {
        self.pending.remove(&id);
    }

    /// Rejects every outstanding call with `Disconnected` and empties the
    /// registry. Called on connection loss.
    pub fn reject_all(&mut self) {
        for (_, tx) in self.pending.drain() {
            let _ = tx.send(Err(ClientError::Disconnected));
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
