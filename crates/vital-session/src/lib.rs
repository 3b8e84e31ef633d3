//! vital-session: Live conversation session runtime
//!
//! This crate owns one open conversation at a time: the session channel to
//! the server, the local transcript and emotion state, coaching hints, and
//! the voice round trip (capture, transcription, synthesis, playback).

pub mod audio;
pub mod connection;
pub mod error;
pub mod events;
pub mod protocol;
pub mod session;
pub mod state;
pub mod transcript;
pub mod transport;

#[cfg(test)]
mod testing;

pub use audio::{AudioInput, AudioOutput, PlaybackState, Recording, RecordingState};
pub use connection::Connection;
pub use error::{Error, Result};
pub use events::SessionEvent;
pub use protocol::{InboundEvent, OutboundIntent};
pub use session::Session;
pub use state::{PendingHint, SessionState};
pub use transcript::{REDO_SPAN, TranscriptStore};
pub use transport::{Frames, Transport, WebSocketTransport};
