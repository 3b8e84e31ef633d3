//! Core types shared by the HTTP client and the session channel

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who produced a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Affect of the simulated family member.
///
/// Labels outside the known vocabulary decode as `Neutral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Denial,
    Anger,
    Bargaining,
    Sadness,
    Acceptance,
    #[default]
    #[serde(other)]
    Neutral,
}

impl Emotion {
    /// All known emotional states, in the order a conversation usually moves through them
    pub const ALL: [Emotion; 6] = [
        Emotion::Neutral,
        Emotion::Denial,
        Emotion::Anger,
        Emotion::Bargaining,
        Emotion::Sadness,
        Emotion::Acceptance,
    ];

    /// Wire label
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Denial => "denial",
            Emotion::Anger => "anger",
            Emotion::Bargaining => "bargaining",
            Emotion::Sadness => "sadness",
            Emotion::Acceptance => "acceptance",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Emotion::Neutral => "Neutral",
            Emotion::Denial => "Denial",
            Emotion::Anger => "Anger",
            Emotion::Bargaining => "Bargaining",
            Emotion::Sadness => "Sadness",
            Emotion::Acceptance => "Acceptance",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str() == lower)
            .ok_or_else(|| format!("unknown emotional state: {}", s))
    }
}

/// One turn in a conversation transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotional_state: Option<Emotion>,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            emotional_state: None,
        }
    }

    /// Create an agent message without an emotional label
    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
            emotional_state: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            emotional_state: None,
        }
    }

    /// Attach an emotional label
    pub fn with_emotion(mut self, emotion: Emotion) -> Self {
        self.emotional_state = Some(emotion);
        self
    }

    pub fn is_agent(&self) -> bool {
        self.role == Role::Agent
    }

    /// Emotional label, defaulting to neutral when absent
    pub fn emotion_or_neutral(&self) -> Emotion {
        self.emotional_state.unwrap_or_default()
    }
}

/// Encoded audio with its container type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl AudioClip {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// File extension matching the mime type
    pub fn extension(&self) -> &'static str {
        match self.mime_type.split(';').next().unwrap_or("").trim() {
            "audio/webm" => "webm",
            "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
            "audio/ogg" => "ogg",
            "audio/mp4" | "audio/m4a" => "m4a",
            "audio/flac" => "flac",
            _ => "mp3",
        }
    }
}

/// A practice scenario from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    #[serde(default)]
    pub patient_age: Option<u32>,
    #[serde(default)]
    pub patient_condition: Option<String>,
}

/// Lifecycle status of a conversation on the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    InProgress,
    Paused,
    Completed,
    Abandoned,
}

/// Request body for starting a conversation
#[derive(Debug, Clone, Serialize)]
pub struct StartConversation {
    pub scenario_id: u64,
    pub user_id: u64,
}

/// A freshly started conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationInfo {
    pub id: u64,
    pub scenario_id: u64,
    pub status: ConversationStatus,
    #[serde(default)]
    pub current_emotional_state: Emotion,
}

/// Result of a pause or resume request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReply {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Audio service availability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioHealth {
    pub status: String,
    #[serde(default)]
    pub whisper_available: bool,
    #[serde(default)]
    pub tts_available: bool,
}
