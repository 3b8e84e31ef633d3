//! Per-conversation client state: transcript, emotion, hint, and audio flags

use vital_api::{Emotion, Message, Role};

use crate::{
    audio::{CaptureMachine, PlaybackSlot, PlaybackState, RecordingState},
    events::SessionEvent,
    transcript::TranscriptStore,
};

/// A coaching hint pushed by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingHint {
    pub content: String,
    pub quality: Option<String>,
    pub visible: bool,
}

/// Client state for one open conversation.
///
/// Mutators return the events describing what changed so the session can
/// surface them in order.
#[derive(Debug)]
pub struct SessionState {
    pub(crate) connected: bool,
    pub(crate) transcript: TranscriptStore,
    pub(crate) current_emotion: Emotion,
    pub(crate) pending_hint: Option<PendingHint>,
    pub(crate) audio_mode: bool,
    pub(crate) capture: CaptureMachine,
    pub(crate) playback: PlaybackSlot,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SessionState {
    pub fn new(audio_mode: bool) -> Self {
        Self {
            connected: false,
            transcript: TranscriptStore::new(),
            current_emotion: Emotion::Neutral,
            pending_hint: None,
            audio_mode,
            capture: CaptureMachine::new(),
            playback: PlaybackSlot::new(),
        }
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn transcript(&self) -> &TranscriptStore {
        &self.transcript
    }

    pub fn current_emotion(&self) -> Emotion {
        self.current_emotion
    }

    pub fn pending_hint(&self) -> Option<&PendingHint> {
        self.pending_hint.as_ref()
    }

    /// The hint text, if one is showing
    pub fn visible_hint(&self) -> Option<&str> {
        self.pending_hint
            .as_ref()
            .filter(|h| h.visible)
            .map(|h| h.content.as_str())
    }

    pub fn audio_mode(&self) -> bool {
        self.audio_mode
    }

    pub fn recording_state(&self) -> RecordingState {
        self.capture.state()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback.state()
    }

    /// Append a turn; agent turns carrying a label update the current emotion
    pub(crate) fn record_message(&mut self, message: Message) -> Vec<SessionEvent> {
        let mut events = Vec::with_capacity(2);
        if message.role == Role::Agent {
            if let Some(emotion) = message.emotional_state.filter(|e| *e != self.current_emotion) {
                self.current_emotion = emotion;
                events.push(SessionEvent::EmotionChanged { emotion });
            }
        }
        self.transcript.append(message.clone());
        events.insert(0, SessionEvent::MessageAppended { message });
        events
    }

    /// Replace the pending hint and show it
    pub(crate) fn show_hint(&mut self, content: String, quality: Option<String>) -> SessionEvent {
        self.pending_hint = Some(PendingHint {
            content: content.clone(),
            quality: quality.clone(),
            visible: true,
        });
        SessionEvent::HintShown { content, quality }
    }

    /// Hide the pending hint; `None` if nothing was showing
    pub(crate) fn dismiss_hint(&mut self) -> Option<SessionEvent> {
        match self.pending_hint.as_mut() {
            Some(hint) if hint.visible => {
                hint.visible = false;
                Some(SessionEvent::HintDismissed)
            }
            _ => None,
        }
    }

    /// Drop the last exchange from the transcript. The current emotion falls
    /// back to the latest remaining labelled agent turn.
    pub(crate) fn rewind(&mut self) -> Vec<SessionEvent> {
        let removed = self.transcript.redo_last();
        if removed == 0 {
            return Vec::new();
        }

        let mut events = vec![SessionEvent::TranscriptRewound { removed }];
        let emotion = self.transcript.latest_agent_emotion().unwrap_or_default();
        if emotion != self.current_emotion {
            self.current_emotion = emotion;
            events.push(SessionEvent::EmotionChanged { emotion });
        }
        events
    }

    /// Discard everything held for the conversation
    pub(crate) fn teardown(&mut self) {
        self.connected = false;
        self.transcript.clear();
        self.pending_hint = None;
        self.capture.reset();
        self.playback.interrupt();
    }
}
