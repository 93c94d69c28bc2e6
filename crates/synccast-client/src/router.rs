//! Inbound frame classification and dispatch.
//!
//! Frames are processed strictly in arrival order, with no reordering
//! across categories. Binary frames never carry JSON envelopes in this
//! protocol, so classification short-circuits on them; text frames are
//! parsed and split by shape: a `method` field marks a request or
//! notification, anything else is a response for the pending-call
//! registry.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use synccast_protocol::{
    CallId, Envelope, Method, NotifyAction, NotifyParams, ProtocolError, RequestEnvelope,
    ResponseEnvelope, RpcError,
};

use crate::client::ModelClient;
use crate::connection::Frame;
use crate::error::{ClientError, ClientResult};
use crate::hooks::Hooks;

/// Where an inbound frame is delivered.
#[derive(Debug, PartialEq)]
pub enum Inbound {
    /// Raw chunk bytes for the streaming handler.
    Chunk(Vec<u8>),
    /// A JSON.SET / JSON.DEL partial update; `None` removes.
    Patch { path: String, value: Option<Value> },
    /// Any other NOTIFY action, forwarded verbatim.
    Notify {
        action: String,
        value: Option<Value>,
        path: String,
    },
    /// MULTICAST / BROADCAST fan-out payload.
    Broadcast(Value),
    /// Correlated response for the request registry.
    Settlement {
        id: u64,
        outcome: Result<Value, RpcError>,
    },
}

/// Classifies one inbound frame. `Ok(None)` means the frame was valid but
/// is deliberately dropped (logged inside); errors mean it could not be
/// decoded at all.
pub fn classify(frame: Frame) -> ClientResult<Option<Inbound>> {
    match frame {
        Frame::Binary(bytes) => Ok(Some(Inbound::Chunk(bytes))),
        Frame::Text(text) => {
            let envelope: Envelope =
                serde_json::from_str(&text).map_err(ProtocolError::from)?;
            match envelope {
                Envelope::Request(req) => classify_request(req),
                Envelope::Response(resp) => Ok(classify_response(resp)),
            }
        }
    }
}

fn classify_request(req: RequestEnvelope) -> ClientResult<Option<Inbound>> {
    match req.method {
        Method::Notify => {
            let params = NotifyParams::decode(req.params)?;
            Ok(Some(match params.action {
                NotifyAction::JsonSet => Inbound::Patch {
                    path: params.path,
                    value: params.value,
                },
                NotifyAction::JsonDel => Inbound::Patch {
                    path: params.path,
                    value: None,
                },
                NotifyAction::Other(action) => Inbound::Notify {
                    action,
                    value: params.value,
                    path: params.path,
                },
            }))
        }
        Method::Multicast | Method::Broadcast => {
            Ok(Some(Inbound::Broadcast(req.params.unwrap_or(Value::Null))))
        }
        other => {
            debug!(method = other.as_str(), "unhandled inbound request, dropping");
            Ok(None)
        }
    }
}

fn classify_response(resp: ResponseEnvelope) -> Option<Inbound> {
    let id = match resp.id {
        Some(CallId::Number(id)) => id,
        Some(CallId::Text(id)) => {
            warn!(id = %id, "response with non-numeric id cannot be correlated, dropping");
            return None;
        }
        None => {
            warn!("response without id cannot be correlated, dropping");
            return None;
        }
    };
    let outcome = match resp.error {
        Some(error) => Err(error),
        None => Ok(resp.result.unwrap_or(Value::Null)),
    };
    Some(Inbound::Settlement { id, outcome })
}

/// Routes classified frames into the registry and the registered
/// capability hooks.
pub struct MessageRouter {
    client: Arc<ModelClient>,
    hooks: Hooks,
}

impl MessageRouter {
    pub fn new(client: Arc<ModelClient>, hooks: Hooks) -> Self {
        Self { client, hooks }
    }

    /// Feeds one inbound transport frame through classification and
    /// dispatch. Undecodable frames are dropped with a warning; they do
    /// not affect the connection.
    pub async fn handle_frame(&self, frame: Frame) {
        let inbound = match classify(frame) {
            Ok(Some(inbound)) => inbound,
            Ok(None) => return,
            Err(err) => {
                warn!(error = %err, "dropping undecodable frame");
                return;
            }
        };
        match inbound {
            Inbound::Chunk(bytes) => {
                if let Some(hook) = &self.hooks.streaming {
                    hook.on_streaming(&bytes);
                }
            }
            Inbound::Patch { path, value } => {
                if let Some(hook) = &self.hooks.update {
                    hook.on_update(value.as_ref(), &path);
                }
            }
            Inbound::Notify {
                action,
                value,
                path,
            } => {
                if let Some(hook) = &self.hooks.notify {
                    hook.on_notify(&action, value.as_ref(), &path);
                }
            }
            Inbound::Broadcast(params) => {
                if let Some(hook) = &self.hooks.multicast {
                    hook.on_multicast(&params);
                }
            }
            Inbound::Settlement { id, outcome } => {
                self.client
                    .settle(id, outcome.map_err(ClientError::Rpc))
                    .await;
            }
        }
    }

    /// Transport opened: lifecycle hook only; the playback layer decides
    /// what to push or fetch.
    pub fn connection_opened(&self) {
        if let Some(hook) = &self.hooks.lifecycle {
            hook.on_open();
        }
    }

    /// Transport closed: rejects every pending call, then notifies the
    /// lifecycle hook.
    pub async fn connection_closed(&self) {
        self.client.connection_lost().await;
        if let Some(hook) = &self.hooks.lifecycle {
            hook.on_close();
        }
    }

    /// Transport error: same teardown as close, with the reason surfaced.
    pub async fn connection_errored(&self, message: &str) {
        self.client.connection_lost().await;
        if let Some(hook) = &self.hooks.lifecycle {
            hook.on_error(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    use crate::connection::PairedConnection;
    use crate::hooks::{MulticastHook, UpdateHook};

    fn text(value: Value) -> Frame {
        Frame::Text(value.to_string())
    }

    #[test]
    fn binary_frames_go_to_streaming() {
        let inbound = classify(Frame::Binary(vec![1, 2, 3])).unwrap();
        assert_eq!(inbound, Some(Inbound::Chunk(vec![1, 2, 3])));
    }

    #[test]
    fn notify_json_set_becomes_patch() {
        let inbound = classify(text(json!({
            "jsonrpc": "2.0",
            "method": "NOTIFY",
            "params": ["JSON.SET", null, "playing", true],
        })))
        .unwrap();
        assert_eq!(
            inbound,
            Some(Inbound::Patch {
                path: "playing".to_string(),
                value: Some(json!(true)),
            })
        );
    }

    #[test]
    fn notify_json_del_is_patch_without_value() {
        let inbound = classify(text(json!({
            "jsonrpc": "2.0",
            "method": "NOTIFY",
            "params": {"action": "JSON.DEL", "path": "source"},
        })))
        .unwrap();
        assert_eq!(
            inbound,
            Some(Inbound::Patch {
                path: "source".to_string(),
                value: None,
            })
        );
    }

    #[test]
    fn other_notify_actions_forward_verbatim() {
        let inbound = classify(text(json!({
            "jsonrpc": "2.0",
            "method": "NOTIFY",
            "params": ["RELOAD", null, ".", {"hard": true}],
        })))
        .unwrap();
        assert_eq!(
            inbound,
            Some(Inbound::Notify {
                action: "RELOAD".to_string(),
                value: Some(json!({"hard": true})),
                path: ".".to_string(),
            })
        );
    }

    #[test]
    fn multicast_and_broadcast_fan_out() {
        for method in ["MULTICAST", "BROADCAST"] {
            let inbound = classify(text(json!({
                "jsonrpc": "2.0",
                "method": method,
                "params": [{"command": "play"}],
            })))
            .unwrap();
            assert_eq!(
                inbound,
                Some(Inbound::Broadcast(json!([{"command": "play"}])))
            );
        }
    }

    #[test]
    fn responses_settle_by_id() {
        let inbound = classify(text(json!({
            "jsonrpc": "2.0",
            "result": 99,
            "id": 5,
        })))
        .unwrap();
        match inbound {
            Some(Inbound::Settlement { id, outcome }) => {
                assert_eq!(id, 5);
                assert_eq!(outcome.unwrap(), json!(99));
            }
            other => panic!("expected settlement, got {:?}", other),
        }
    }

    #[test]
    fn error_responses_carry_the_rpc_error() {
        let inbound = classify(text(json!({
            "jsonrpc": "2.0",
            "error": {"code": -32601, "message": "method not found"},
            "id": 2,
        })))
        .unwrap();
        match inbound {
            Some(Inbound::Settlement { id, outcome }) => {
                assert_eq!(id, 2);
                assert_eq!(outcome.unwrap_err().code, -32601);
            }
            other => panic!("expected settlement, got {:?}", other),
        }
    }

    #[test]
    fn response_without_id_is_dropped() {
        let inbound = classify(text(json!({"jsonrpc": "2.0", "result": 1}))).unwrap();
        assert_eq!(inbound, None);
    }

    #[test]
    fn unhandled_request_methods_are_dropped() {
        let inbound = classify(text(json!({
            "jsonrpc": "2.0",
            "method": "GET",
            "params": ["."],
            "id": 1,
        })))
        .unwrap();
        assert_eq!(inbound, None);
    }

    #[test]
    fn garbage_text_is_an_error() {
        assert!(classify(Frame::Text("not json".to_string())).is_err());
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl UpdateHook for Arc<Recorder> {
        fn on_update(&self, value: Option<&Value>, path: &str) {
            self.0
                .lock()
                .unwrap()
                .push(format!("update {} {:?}", path, value));
        }
    }

    impl MulticastHook for Arc<Recorder> {
        fn on_multicast(&self, params: &Value) {
            self.0.lock().unwrap().push(format!("multicast {}", params));
        }
    }

    #[tokio::test]
    async fn dispatches_to_registered_hooks_only() {
        let (conn, _inbound) = PairedConnection::pair();
        let client = Arc::new(ModelClient::new(conn));
        let recorder = Arc::new(Recorder::default());
        let hooks = Hooks::new()
            .on_update(Arc::clone(&recorder))
            .on_multicast(Arc::clone(&recorder));
        let router = MessageRouter::new(client, hooks);

        router
            .handle_frame(text(json!({
                "jsonrpc": "2.0",
                "method": "NOTIFY",
                "params": ["JSON.SET", null, "muted", true],
            })))
            .await;
        router
            .handle_frame(text(json!({
                "jsonrpc": "2.0",
                "method": "MULTICAST",
                "params": [{"command": "pause"}],
            })))
            .await;
        // No streaming hook registered; the chunk is ignored.
        router.handle_frame(Frame::Binary(vec![0; 16])).await;

        let log = recorder.0.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert!(log[0].starts_with("update muted"));
        assert!(log[1].starts_with("multicast"));
    }

    #[tokio::test]
    async fn settlement_reaches_the_registry() {
        let (conn, mut outbound) = PairedConnection::pair();
        let client = Arc::new(ModelClient::new(conn));
        let router = MessageRouter::new(Arc::clone(&client), Hooks::new());

        let caller = {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                client.invoke(Method::Get, json!(["."])).await
            })
        };
        outbound.recv().await.unwrap();

        router
            .handle_frame(text(json!({
                "jsonrpc": "2.0",
                "result": {"muted": false},
                "id": 1,
            })))
            .await;
        assert_eq!(caller.await.unwrap().unwrap(), json!({"muted": false}));
    }
}
