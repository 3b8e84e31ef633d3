//! Speech conversion seam

use async_trait::async_trait;

use crate::{AudioClip, Emotion, Result};

/// External speech service: one-shot conversions in each direction.
///
/// Implementations make a single attempt per call; callers decide what a
/// failure means for them.
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Transcribe a captured clip to text
    async fn speech_to_text(&self, clip: AudioClip) -> Result<String>;

    /// Synthesize speech for an agent turn, voiced for its emotional state
    async fn text_to_speech(&self, text: &str, emotion: Emotion) -> Result<AudioClip>;
}
