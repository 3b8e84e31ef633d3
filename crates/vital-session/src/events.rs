//! Session event types

use serde::{Deserialize, Serialize};
use vital_api::{Emotion, Message};

use crate::audio::{PlaybackState, RecordingState};

/// Events emitted by a running session, after its state has been updated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The session channel went down; no reconnection follows
    Disconnected,

    /// A turn was added to the transcript (inbound, or the local echo of a
    /// user turn)
    MessageAppended { message: Message },

    /// The current emotional state changed
    EmotionChanged { emotion: Emotion },

    /// A coaching hint is now showing
    HintShown {
        content: String,
        quality: Option<String>,
    },

    /// The pending hint was dismissed
    HintDismissed,

    /// A notice from the server that must be shown to the user
    SystemNotice {
        content: String,
        status: Option<String>,
    },

    /// The last exchange was removed from the transcript
    TranscriptRewound { removed: usize },

    /// Audio mode was switched on or off
    AudioModeChanged { enabled: bool },

    /// Capture side moved to a new state
    RecordingStateChanged { state: RecordingState },

    /// Playback side moved to a new state
    PlaybackStateChanged { state: PlaybackState },

    /// A local failure the user must be told about (microphone, transcription)
    Error { message: String },
}

impl SessionEvent {
    /// Whether this event needs the user's attention before continuing
    pub fn is_blocking_notice(&self) -> bool {
        matches!(
            self,
            SessionEvent::SystemNotice { .. } | SessionEvent::Error { .. }
        )
    }
}
