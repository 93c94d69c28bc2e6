//! JSON-RPC 2.0 envelope types.
//!
//! An inbound text frame is either request-shaped (it carries a `method`)
//! or response-shaped (it carries `result`/`error` and an `id`). A request
//! without an `id` is a notification: fire-and-forget, no response expected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProtocolError, ProtocolResult};

/// Protocol version carried in every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// A decoded text frame: request-shaped or response-shaped.
///
/// Deserialization tries the request shape first, so the presence of a
/// `method` field is what classifies a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    Request(RequestEnvelope),
    Response(ResponseEnvelope),
}

/// A request or notification envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub jsonrpc: String,
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CallId>,
}

impl RequestEnvelope {
    /// Creates a correlated call envelope.
    pub fn call(method: Method, params: Value, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method,
            params: Some(params),
            id: Some(CallId::Number(id)),
        }
    }

    /// Creates a notification envelope (no id, no response expected).
    pub fn notification(method: Method, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method,
            params: Some(params),
            id: None,
        }
    }

    /// Serializes the envelope to its wire text.
    pub fn encode(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A response envelope carrying either a result or an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    #[serde(default)]
    pub id: Option<CallId>,
}

impl ResponseEnvelope {
    /// Creates a success response.
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            result: Some(result),
            error: None,
            id: Some(CallId::Number(id)),
        }
    }

    /// Creates an error response.
    pub fn failure(id: u64, error: RpcError) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            result: None,
            error: Some(error),
            id: Some(CallId::Number(id)),
        }
    }

    /// Serializes the envelope to its wire text.
    pub fn encode(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Correlation id: servers may echo either integers or strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallId {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A peer-reported call failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rpc error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

/// The closed set of reserved methods, with a fallthrough arm for anything
/// a peer sends that this client does not dispatch on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read the value at a path; params `[path]`.
    Get,
    /// Notification: write a value at a path; params `[value, path]`.
    Set,
    /// Notification: remove the value at a path; params `[path]`.
    Del,
    /// Server-pushed partial update; params `[action, _, path, value]`
    /// or `{action, path, value}`.
    Notify,
    /// Unstructured fan-out to session members.
    Multicast,
    /// Unstructured fan-out to every connected peer.
    Broadcast,
    /// Allocates a server-side binary buffer handle for a media source.
    InstantFile,
    /// Any other method name, carried verbatim.
    Other(String),
}

impl Method {
    /// Returns the wire name of the method.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Set => "SET",
            Self::Del => "DEL",
            Self::Notify => "NOTIFY",
            Self::Multicast => "MULTICAST",
            Self::Broadcast => "BROADCAST",
            Self::InstantFile => "INSTANT_FILE",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for Method {
    fn from(name: &str) -> Self {
        match name {
            "GET" => Self::Get,
            "SET" => Self::Set,
            "DEL" => Self::Del,
            "NOTIFY" => Self::Notify,
            "MULTICAST" => Self::Multicast,
            "BROADCAST" => Self::Broadcast,
            "INSTANT_FILE" => Self::InstantFile,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Serialize for Method {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Method {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Method::from(name.as_str()))
    }
}

/// NOTIFY sub-actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyAction {
    /// Apply a value at a path.
    JsonSet,
    /// Remove the value at a path.
    JsonDel,
    /// Any other action, forwarded verbatim to the notify handler.
    Other(String),
}

impl NotifyAction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::JsonSet => "JSON.SET",
            Self::JsonDel => "JSON.DEL",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for NotifyAction {
    fn from(name: &str) -> Self {
        match name {
            "JSON.SET" => Self::JsonSet,
            "JSON.DEL" => Self::JsonDel,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Decoded NOTIFY params.
///
/// The wire carries them either positionally (`[action, _, path, value]`,
/// the second slot is unused) or by name (`{action, path, value}`).
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyParams {
    pub action: NotifyAction,
    pub path: String,
    pub value: Option<Value>,
}

impl NotifyParams {
    /// Decodes NOTIFY params from either wire form. A missing path
    /// addresses the document root.
    pub fn decode(params: Option<Value>) -> ProtocolResult<Self> {
        let params = params.unwrap_or(Value::Null);
        match params {
            Value::Array(mut items) => {
                let action = match items.first().and_then(Value::as_str) {
                    Some(name) => NotifyAction::from(name),
                    None => return Err(bad_notify(&items)),
                };
                let path = items
                    .get(2)
                    .and_then(Value::as_str)
                    .unwrap_or(".")
                    .to_string();
                let value = if items.len() > 3 {
                    Some(items.swap_remove(3))
                } else {
                    None
                };
                Ok(Self {
                    action,
                    path,
                    value,
                })
            }
            Value::Object(mut map) => {
                let action = match map.get("action").and_then(Value::as_str) {
                    Some(name) => NotifyAction::from(name),
                    None => return Err(bad_notify(&map)),
                };
                let path = map
                    .get("path")
                    .and_then(Value::as_str)
                    .unwrap_or(".")
                    .to_string();
                let value = map.remove("value");
                Ok(Self {
                    action,
                    path,
                    value,
                })
            }
            other => Err(bad_notify(&other)),
        }
    }
}

fn bad_notify<T: std::fmt::Debug>(params: &T) -> ProtocolError {
    ProtocolError::Serialization(serde::de::Error::custom(format!(
        "NOTIFY params missing action: {:?}",
        params
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_roundtrip() {
        let call = RequestEnvelope::call(Method::Get, json!(["playing"]), 7);
        let text = call.encode().unwrap();
        let decoded: Envelope = serde_json::from_str(&text).unwrap();
        match decoded {
            Envelope::Request(req) => {
                assert_eq!(req.method, Method::Get);
                assert_eq!(req.id, Some(CallId::Number(7)));
                assert_eq!(req.params, Some(json!(["playing"])));
            }
            Envelope::Response(_) => panic!("expected request"),
        }
    }

    #[test]
    fn notification_has_no_id() {
        let text = RequestEnvelope::notification(Method::Set, json!([true, "playing"]))
            .encode()
            .unwrap();
        assert!(!text.contains("\"id\""));
        let decoded: Envelope = serde_json::from_str(&text).unwrap();
        match decoded {
            Envelope::Request(req) => assert_eq!(req.id, None),
            Envelope::Response(_) => panic!("expected request"),
        }
    }

    #[test]
    fn response_classified_by_missing_method() {
        let text = r#"{"jsonrpc":"2.0","result":{"playing":true},"id":3}"#;
        let decoded: Envelope = serde_json::from_str(text).unwrap();
        match decoded {
            Envelope::Response(resp) => {
                assert_eq!(resp.id, Some(CallId::Number(3)));
                assert_eq!(resp.result, Some(json!({"playing": true})));
                assert!(resp.error.is_none());
            }
            Envelope::Request(_) => panic!("expected response"),
        }
    }

    #[test]
    fn error_response_roundtrip() {
        let resp = ResponseEnvelope::failure(4, RpcError::new(-32601, "method not found"));
        let text = resp.encode().unwrap();
        let decoded: Envelope = serde_json::from_str(&text).unwrap();
        match decoded {
            Envelope::Response(resp) => {
                let error = resp.error.unwrap();
                assert_eq!(error.code, -32601);
                assert_eq!(error.message, "method not found");
            }
            Envelope::Request(_) => panic!("expected response"),
        }
    }

    #[test]
    fn unknown_method_preserved() {
        let text = r#"{"jsonrpc":"2.0","method":"PUBLISH","params":[]}"#;
        let decoded: Envelope = serde_json::from_str(text).unwrap();
        match decoded {
            Envelope::Request(req) => {
                assert_eq!(req.method, Method::Other("PUBLISH".to_string()));
                assert_eq!(req.method.as_str(), "PUBLISH");
            }
            Envelope::Response(_) => panic!("expected request"),
        }
    }

    #[test]
    fn notify_params_positional() {
        let params = NotifyParams::decode(Some(json!([
            "JSON.SET",
            null,
            "playing",
            true
        ])))
        .unwrap();
        assert_eq!(params.action, NotifyAction::JsonSet);
        assert_eq!(params.path, "playing");
        assert_eq!(params.value, Some(json!(true)));
    }

    #[test]
    fn notify_params_named() {
        let params = NotifyParams::decode(Some(json!({
            "action": "JSON.DEL",
            "path": "source",
        })))
        .unwrap();
        assert_eq!(params.action, NotifyAction::JsonDel);
        assert_eq!(params.path, "source");
        assert_eq!(params.value, None);
    }

    #[test]
    fn notify_params_missing_path_defaults_to_root() {
        let params = NotifyParams::decode(Some(json!(["JSON.SET"]))).unwrap();
        assert_eq!(params.path, ".");
        assert_eq!(params.value, None);
    }

    #[test]
    fn notify_params_without_action_rejected() {
        assert!(NotifyParams::decode(Some(json!([42]))).is_err());
        assert!(NotifyParams::decode(Some(json!({"path": "a"}))).is_err());
        assert!(NotifyParams::decode(None).is_err());
    }

    #[test]
    fn string_call_id_accepted() {
        let text = r#"{"jsonrpc":"2.0","result":true,"id":"playing"}"#;
        let decoded: Envelope = serde_json::from_str(text).unwrap();
        match decoded {
            Envelope::Response(resp) => {
                assert_eq!(resp.id, Some(CallId::Text("playing".to_string())));
            }
            Envelope::Request(_) => panic!("expected response"),
        }
    }
}
