//! Envelopes exchanged between a chat panel and the relay.
//!
//! Both directions are JSON objects discriminated by `command`, the same
//! shape a webview's `postMessage` carries:
//!
//! ```json
//! { "command": "askAI", "text": "hello", "id": 3 }
//! { "command": "aiResponse", "text": "Hi!", "id": 3 }
//! ```
//!
//! Names follow the panel's point of view: *outbound* leaves the panel,
//! *inbound* arrives at it.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ASK_AI: &str = "askAI";
pub const AI_RESPONSE: &str = "aiResponse";

/// Panel → relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum OutboundMessage {
    #[serde(rename = "askAI")]
    AskAi {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
    },
}

/// Relay → panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum InboundMessage {
    #[serde(rename = "aiResponse")]
    AiResponse {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
    },
}

impl OutboundMessage {
    pub fn ask(text: impl Into<String>, id: Option<u64>) -> Self {
        OutboundMessage::AskAi {
            text: text.into(),
            id,
        }
    }

    /// Interpret a raw envelope. Anything that is not a well-formed,
    /// recognized command yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let command = value.get("command").and_then(Value::as_str);
        match command {
            Some(ASK_AI) => match serde_json::from_value(value.clone()) {
                Ok(message) => Some(message),
                Err(e) => {
                    debug!("Ignoring malformed {} envelope: {}", ASK_AI, e);
                    None
                }
            },
            Some(other) => {
                debug!("Ignoring unrecognized command {:?}", other);
                None
            }
            None => {
                debug!("Ignoring envelope without a command: {}", value);
                None
            }
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl InboundMessage {
    pub fn response(text: impl Into<String>, id: Option<u64>) -> Self {
        InboundMessage::AiResponse {
            text: text.into(),
            id,
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value.get("command").and_then(Value::as_str) {
            Some(AI_RESPONSE) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> &str {
        match self {
            InboundMessage::AiResponse { text, .. } => text,
        }
    }

    pub fn id(&self) -> Option<u64> {
        match self {
            InboundMessage::AiResponse { id, .. } => *id,
        }
    }
}
