//! Wire format of the session channel
//!
//! Frames are JSON text. Inbound frames are tagged by `type`; chat payloads
//! may omit the tag or carry `"type": "message"`.

use serde::{Deserialize, Serialize};
use vital_api::{Emotion, Message, Role};

use crate::error::{Error, Result};

/// An inbound event, classified by its tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Coaching suggestion; replaces any pending hint
    Hint {
        content: String,
        quality: Option<String>,
    },
    /// Notice that must be shown to the user
    System {
        content: String,
        status: Option<String>,
    },
    /// The server refused the last user turn; it produced no reply
    Warning { content: String },
    /// A transcript turn
    Chat(Message),
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    emotional_state: Option<Emotion>,
    #[serde(default)]
    quality: Option<serde_json::Value>,
    #[serde(default)]
    status: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

fn value_text(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

impl InboundEvent {
    /// Decode one text frame.
    ///
    /// Unknown tags and chat payloads without a role are protocol errors;
    /// they are never rendered as chat.
    pub fn decode(text: &str) -> Result<Self> {
        let raw: RawFrame = serde_json::from_str(text)?;

        match raw.kind.as_deref() {
            Some("hint") => Ok(InboundEvent::Hint {
                content: raw.content.unwrap_or_default(),
                quality: value_text(raw.quality),
            }),
            Some("system") => Ok(InboundEvent::System {
                content: raw.content.unwrap_or_default(),
                status: value_text(raw.status),
            }),
            Some("warning") => Ok(InboundEvent::Warning {
                content: raw.content.unwrap_or_default(),
            }),
            // Failure reply, e.g. for an unknown conversation
            None if raw.role.is_none() && raw.error.is_some() => Ok(InboundEvent::System {
                content: raw.error.unwrap_or_default(),
                status: Some("error".to_string()),
            }),
            None | Some("message") => {
                let role = raw
                    .role
                    .ok_or_else(|| Error::Protocol("chat payload without role".to_string()))?;
                let content = raw
                    .content
                    .ok_or_else(|| Error::Protocol("chat payload without content".to_string()))?;
                Ok(InboundEvent::Chat(Message {
                    role,
                    content,
                    emotional_state: raw.emotional_state,
                }))
            }
            Some(other) => Err(Error::Protocol(format!("unknown event type {:?}", other))),
        }
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Hint { .. } => "hint",
            InboundEvent::System { .. } => "system",
            InboundEvent::Warning { .. } => "warning",
            InboundEvent::Chat(_) => "chat",
        }
    }
}

/// Everything the client may send over the channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundIntent {
    /// A user turn
    Message { content: String },
    /// Undo the last exchange on the server side
    Redo,
    /// Request a coaching hint
    Hint,
}

impl OutboundIntent {
    pub fn message(content: impl Into<String>) -> Self {
        OutboundIntent::Message {
            content: content.into(),
        }
    }

    /// Encode as a text frame
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
