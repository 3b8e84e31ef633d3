//! Audio pipeline: capture → speech-to-text, and text-to-speech → playback
//!
//! Devices sit behind [`AudioInput`] and [`AudioOutput`] so the session does
//! not care whether audio comes from a sound card, a subprocess, or a test.
//! Each direction has a single slot: one capture and one playback at most.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use vital_api::{AudioClip, Emotion, SpeechService};

use crate::error::{Error, Result};

/// Capture-side state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
    Transcribing,
}

/// Playback-side state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
}

/// A microphone
#[async_trait]
pub trait AudioInput: Send + Sync {
    /// Open the device and begin capturing.
    ///
    /// Fails with `Error::MicrophoneUnavailable` when access is denied or
    /// no device exists.
    async fn start(&self) -> Result<Box<dyn Recording>>;
}

/// A capture in progress
#[async_trait]
pub trait Recording: Send {
    /// Stop capturing and hand back everything recorded
    async fn finish(self: Box<Self>) -> Result<AudioClip>;
}

/// A speaker
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Play a clip to completion
    async fn play(&self, clip: AudioClip) -> Result<()>;
}

/// Capture state machine: `idle → recording → transcribing → idle`.
#[derive(Default)]
pub struct CaptureMachine {
    state: RecordingState,
    active: Option<Box<dyn Recording>>,
}

impl std::fmt::Debug for CaptureMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureMachine")
            .field("state", &self.state)
            .field("active", &self.active.is_some())
            .finish()
    }
}

impl CaptureMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Reject a new capture unless idle
    pub fn ensure_idle(&self) -> Result<()> {
        match self.state {
            RecordingState::Idle => Ok(()),
            RecordingState::Recording => Err(Error::InvalidTransition(
                "already recording".to_string(),
            )),
            RecordingState::Transcribing => Err(Error::InvalidTransition(
                "previous recording is still being transcribed".to_string(),
            )),
        }
    }

    /// `idle → recording`, holding the opened capture
    pub fn begin(&mut self, recording: Box<dyn Recording>) -> Result<()> {
        self.ensure_idle()?;
        self.active = Some(recording);
        self.state = RecordingState::Recording;
        Ok(())
    }

    /// `recording → transcribing`, releasing the capture for conversion
    pub fn stop(&mut self) -> Result<Box<dyn Recording>> {
        if self.state != RecordingState::Recording {
            return Err(Error::InvalidTransition("not recording".to_string()));
        }
        let recording = self
            .active
            .take()
            .ok_or_else(|| Error::InvalidTransition("no active capture".to_string()))?;
        self.state = RecordingState::Transcribing;
        Ok(recording)
    }

    /// `transcribing → idle`, on success or failure alike
    pub fn finish(&mut self) -> Result<()> {
        if self.state != RecordingState::Transcribing {
            return Err(Error::InvalidTransition("not transcribing".to_string()));
        }
        self.state = RecordingState::Idle;
        Ok(())
    }

    /// Drop any capture and go back to idle
    pub fn reset(&mut self) {
        self.active = None;
        self.state = RecordingState::Idle;
    }
}

/// Single-slot playback guard.
///
/// Starting a playback while one is running cancels the running one; the
/// generation counter lets late completions of a cancelled playback be
/// told apart from the current one.
#[derive(Debug, Default)]
pub struct PlaybackSlot {
    state: PlaybackState,
    generation: u64,
    cancel: Option<CancellationToken>,
}

/// Ticket for one playback
#[derive(Debug, Clone)]
pub struct PlaybackTicket {
    pub generation: u64,
    pub cancel: CancellationToken,
    /// Whether an earlier playback was cut off to make room
    pub interrupted: bool,
}

impl PlaybackSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// `idle → playing` (or `playing → playing` with the old one cancelled)
    pub fn begin(&mut self, parent: &CancellationToken) -> PlaybackTicket {
        let interrupted = self.interrupt();
        self.generation += 1;
        let cancel = parent.child_token();
        self.cancel = Some(cancel.clone());
        self.state = PlaybackState::Playing;
        PlaybackTicket {
            generation: self.generation,
            cancel,
            interrupted,
        }
    }

    /// `playing → idle` for the current playback. Returns false for a stale
    /// generation, which leaves the slot untouched.
    pub fn complete(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.state != PlaybackState::Playing {
            return false;
        }
        self.cancel = None;
        self.state = PlaybackState::Idle;
        true
    }

    /// Cancel whatever is playing. Returns whether anything was.
    pub fn interrupt(&mut self) -> bool {
        let was_playing = self.state == PlaybackState::Playing;
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.state = PlaybackState::Idle;
        was_playing
    }
}

/// Finish a capture and transcribe it. Empty transcriptions count as failures.
pub async fn transcribe(recording: Box<dyn Recording>, speech: &dyn SpeechService) -> Result<String> {
    let clip = recording.finish().await?;
    if clip.is_empty() {
        return Err(Error::Audio("no audio was captured".to_string()));
    }
    tracing::debug!("Transcribing {} bytes of {}", clip.data.len(), clip.mime_type);

    let text = speech.speech_to_text(clip).await?;
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::Audio("no speech was recognized".to_string()));
    }
    Ok(text.to_string())
}

/// Synthesize and play one agent turn, stopping early if cancelled
pub async fn speak(
    text: &str,
    emotion: Emotion,
    speech: &dyn SpeechService,
    output: &dyn AudioOutput,
    cancel: &CancellationToken,
) -> Result<()> {
    let work = async {
        let clip = speech.text_to_speech(text, emotion).await?;
        output.play(clip).await
    };
    tokio::select! {
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = work => result,
    }
}
