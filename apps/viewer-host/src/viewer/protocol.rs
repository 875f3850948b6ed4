//! Wire format spoken between a viewer surface and its session.
//!
//! Requests: `{"callbackId": <any>, "name": "initialize" | "getInitialZoom" |
//! "getDefaultZoom"}`. Every request gets exactly one reply echoing its
//! `callbackId`, either `{"success": true, "response": ..}` or
//! `{"success": false, "error": ".."}`. Zoom changes are pushed unsolicited as
//! `{"event": "onZoomLevelChanged", "args": [factor]}`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use stream_handoff::MergedHeaders;
use thiserror::Error;

pub const ZOOM_LEVEL_CHANGED_EVENT: &str = "onZoomLevelChanged";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerCall {
    Initialize,
    GetInitialZoom,
    GetDefaultZoom,
}

impl ViewerCall {
    pub fn name(self) -> &'static str {
        match self {
            ViewerCall::Initialize => "initialize",
            ViewerCall::GetInitialZoom => "getInitialZoom",
            ViewerCall::GetDefaultZoom => "getDefaultZoom",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "initialize" => Some(ViewerCall::Initialize),
            "getInitialZoom" => Some(ViewerCall::GetInitialZoom),
            "getDefaultZoom" => Some(ViewerCall::GetDefaultZoom),
            _ => None,
        }
    }
}

impl fmt::Display for ViewerCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed viewer message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown viewer message {name:?}")]
    UnknownMessage { name: String, callback_id: Value },
}

impl ProtocolError {
    /// Correlation token to echo in the rejection, when one could be read.
    pub fn callback_id(&self) -> Value {
        match self {
            ProtocolError::Malformed(_) => Value::Null,
            ProtocolError::UnknownMessage { callback_id, .. } => callback_id.clone(),
        }
    }
}

#[derive(Deserialize)]
struct RawRequest {
    #[serde(rename = "callbackId", default)]
    callback_id: Value,
    name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerRequest {
    pub callback_id: Value,
    pub call: ViewerCall,
}

impl ViewerRequest {
    pub fn new(callback_id: impl Into<Value>, call: ViewerCall) -> Self {
        Self {
            callback_id: callback_id.into(),
            call,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let RawRequest { callback_id, name } = serde_json::from_str(raw)?;
        match ViewerCall::from_name(&name) {
            Some(call) => Ok(Self { callback_id, call }),
            None => Err(ProtocolError::UnknownMessage { name, callback_id }),
        }
    }

    pub fn to_json(&self) -> String {
        json!({ "callbackId": self.callback_id, "name": self.call.name() }).to_string()
    }
}

/// Payload of a successful `initialize`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamInfo {
    #[serde(rename = "streamURL")]
    pub stream_url: String,
    #[serde(rename = "originalURL")]
    pub original_url: String,
    #[serde(rename = "responseHeaders")]
    pub response_headers: MergedHeaders,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ViewerReply {
    StreamInfo(StreamInfo),
    ZoomFactor(f64),
}

pub fn encode_reply(callback_id: &Value, reply: &ViewerReply) -> String {
    json!({ "callbackId": callback_id, "success": true, "response": reply }).to_string()
}

pub fn encode_rejection(callback_id: &Value, error: &dyn fmt::Display) -> String {
    json!({ "callbackId": callback_id, "success": false, "error": error.to_string() }).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerEvent {
    ZoomLevelChanged(f64),
}

impl ViewerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ViewerEvent::ZoomLevelChanged(_) => ZOOM_LEVEL_CHANGED_EVENT,
        }
    }

    pub fn to_json(&self) -> String {
        match self {
            ViewerEvent::ZoomLevelChanged(factor) => {
                json!({ "event": self.name(), "args": [factor] }).to_string()
            }
        }
    }
}
