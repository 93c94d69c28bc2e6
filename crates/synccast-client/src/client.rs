//! Send side of the protocol: correlated calls and notifications.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::debug;

use synccast_protocol::{InstantFile, MediaSource, Method, ProtocolError, RequestEnvelope};

use crate::config::SyncConfig;
use crate::connection::Connection;
use crate::error::{ClientError, ClientResult};
use crate::registry::{RequestRegistry, Settlement};

/// Client handle for one persistent connection.
///
/// `invoke` suspends the caller until the matching response arrives or the
/// connection closes; `notify` is fire-and-forget. Settlement order is not
/// invocation order: callers may only rely on id correlation.
pub struct ModelClient {
    conn: Arc<dyn Connection>,
    registry: Mutex<RequestRegistry>,
    request_timeout: Option<Duration>,
}

impl ModelClient {
    /// Creates a client over an open connection.
    pub fn new(conn: Arc<dyn Connection>) -> Self {
        Self {
            conn,
            registry: Mutex::new(RequestRegistry::new()),
            request_timeout: None,
        }
    }

    /// Creates a client with session configuration applied.
    pub fn with_config(conn: Arc<dyn Connection>, config: &SyncConfig) -> Self {
        Self {
            conn,
            registry: Mutex::new(RequestRegistry::new()),
            request_timeout: config.request_timeout,
        }
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.conn
    }

    /// Sends a correlated call and waits for its settlement.
    ///
    /// Fails immediately with `Disconnected` when the connection is not
    /// ready. The returned future settles exactly once: with the
    /// response's result, with the peer's structured error, or with
    /// `Disconnected` when the connection is lost first.
    pub async fn invoke(&self, method: Method, params: Value) -> ClientResult<Value> {
        if !self.conn.is_ready() {
            return Err(ClientError::Disconnected);
        }

        let (id, rx) = self.registry.lock().await.register();
        let envelope = RequestEnvelope::call(method, params, id);
        debug!(id, method = envelope.method.as_str(), "invoking");

        if let Err(err) = self.conn.send_text(envelope.encode()?) {
            self.registry.lock().await.discard(id);
            return Err(err);
        }

        let settled = match self.request_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, rx).await {
                Ok(settled) => settled,
                Err(_) => {
                    self.registry.lock().await.discard(id);
                    return Err(ClientError::Timeout(format!("call {} timed out", id)));
                }
            },
            None => rx.await,
        };

        // A dropped sender means the registry was torn down.
        settled.map_err(|_| ClientError::Disconnected)?
    }

    /// Sends a notification: same serialization as a call, no id, no
    /// pending result, no delivery guarantee beyond the transport's.
    pub fn notify(&self, method: Method, params: Value) -> ClientResult<()> {
        if !self.conn.is_ready() {
            return Err(ClientError::Disconnected);
        }
        let envelope = RequestEnvelope::notification(method, params);
        self.conn.send_text(envelope.encode()?)
    }

    /// Reads the shared document at `path`.
    pub async fn get_data(&self, path: &str) -> ClientResult<Value> {
        self.invoke(Method::Get, json!([path])).await
    }

    /// Writes `value` at `path` in the shared document.
    pub fn set_data(&self, value: Value, path: &str) -> ClientResult<()> {
        self.notify(Method::Set, json!([value, path]))
    }

    /// Removes the value at `path` in the shared document.
    pub fn del_data(&self, path: &str) -> ClientResult<()> {
        self.notify(Method::Del, json!([path]))
    }

    /// Fans `value` out to the other session members.
    pub fn multicast(&self, value: Value) -> ClientResult<()> {
        self.notify(Method::Multicast, json!([value]))
    }

    /// Fans `value` out to every connected peer.
    pub fn broadcast(&self, value: Value) -> ClientResult<()> {
        self.notify(Method::Broadcast, json!([value]))
    }

    /// Allocates a server-side binary buffer for a media source, returning
    /// the stream id and URL viewers fetch it from.
    pub async fn instant_file(&self, source: &MediaSource) -> ClientResult<InstantFile> {
        let params = serde_json::to_value(source).map_err(ProtocolError::from)?;
        let result = self.invoke(Method::InstantFile, params).await?;
        serde_json::from_value(result)
            .map_err(|err| ClientError::Protocol(ProtocolError::from(err)))
    }

    /// Settles the pending call for `id`; unknown ids are logged and
    /// dropped by the registry.
    pub async fn settle(&self, id: u64, outcome: Settlement) {
        self.registry.lock().await.settle(id, outcome);
    }

    /// Connection-loss teardown: every outstanding call is rejected with
    /// `Disconnected` and the pending set becomes empty.
    pub async fn connection_lost(&self) {
        self.registry.lock().await.reject_all();
    }

    /// Number of calls still awaiting responses.
    pub async fn pending_count(&self) -> usize {
        self.registry.lock().await.pending_count()
    }
}
