//! Append-only transcript with bounded undo

use vital_api::{Emotion, Message, Role};

/// Number of entries one redo removes: the latest user turn and its reply
pub const REDO_SPAN: usize = 2;

/// Ordered log of exchanged messages.
///
/// Insertion order is transcript order. The only removal besides `clear` is
/// `redo_last`, which is positional: it drops the last two entries whatever
/// their roles are.
#[derive(Debug, Clone, Default)]
pub struct TranscriptStore {
    messages: Vec<Message>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message at the end
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Remove the last exchange. Returns the number of entries removed
    /// (two, or zero when fewer than two exist).
    pub fn redo_last(&mut self) -> usize {
        if self.messages.len() < REDO_SPAN {
            return 0;
        }
        let keep = self.messages.len() - REDO_SPAN;
        self.messages.truncate(keep);
        REDO_SPAN
    }

    /// Whether `redo_last` would remove anything
    pub fn can_redo(&self) -> bool {
        self.messages.len() >= REDO_SPAN
    }

    /// Drop everything; used at session teardown
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Emotional label of the most recent agent turn that carried one
    pub fn latest_agent_emotion(&self) -> Option<Emotion> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.role == Role::Agent)
            .find_map(|m| m.emotional_state)
    }

    /// Count of turns per role: (user, agent, system)
    pub fn role_counts(&self) -> (usize, usize, usize) {
        self.messages
            .iter()
            .fold((0, 0, 0), |(u, a, s), m| match m.role {
                Role::User => (u + 1, a, s),
                Role::Agent => (u, a + 1, s),
                Role::System => (u, a, s + 1),
            })
    }
}
