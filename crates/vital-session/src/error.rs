//! Error types for vital-session

use thiserror::Error;

/// Result type alias using vital-session Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a conversation session
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the REST/speech layer
    #[error(transparent)]
    Api(#[from] vital_api::Error),

    /// The session channel failed at the WebSocket level
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON encoding/decoding of a frame failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The channel is not open, nothing was sent
    #[error("Not connected to the conversation server")]
    NotConnected,

    /// An inbound frame did not match any known event shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The microphone could not be opened
    #[error("Microphone unavailable: {0}")]
    MicrophoneUnavailable(String),

    /// Audio capture or playback failed
    #[error("Audio error: {0}")]
    Audio(String),

    /// A state machine was asked for a transition it cannot make
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// The operation was interrupted before it finished
    #[error("Cancelled")]
    Cancelled,
}

impl Error {
    /// Whether this failure should be shown to the user as a blocking notice
    /// rather than only logged
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Error::Cancelled | Error::Protocol(_))
    }
}
