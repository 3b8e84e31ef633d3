//! Test doubles for the transport, speech, and audio seams

use std::sync::Arc;

use async_trait::async_trait;
use futures::{
    SinkExt, StreamExt,
    channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded},
};
use parking_lot::Mutex;
use vital_api::{AudioClip, Emotion, SpeechService};

use crate::{
    audio::{AudioInput, AudioOutput, Recording},
    error::{Error, Result},
    transport::{Frames, Transport},
};

/// Transport handing out one in-memory channel
pub struct MockTransport {
    frames: Mutex<Option<Frames>>,
}

/// The server's side of a [`MockTransport`] channel
pub struct ServerEnd {
    to_client: UnboundedSender<Result<String>>,
    from_client: UnboundedReceiver<String>,
}

impl MockTransport {
    pub fn pair() -> (Self, ServerEnd) {
        let (to_client, client_rx) = unbounded::<Result<String>>();
        let (client_tx, from_client) = unbounded::<String>();
        let frames = Frames {
            sink: Box::pin(client_tx.sink_map_err(|e| Error::Protocol(e.to_string()))),
            stream: Box::pin(client_rx),
        };
        (
            Self {
                frames: Mutex::new(Some(frames)),
            },
            ServerEnd {
                to_client,
                from_client,
            },
        )
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, _url: &str) -> Result<Frames> {
        self.frames
            .lock()
            .take()
            .ok_or_else(|| Error::Protocol("mock transport already used".to_string()))
    }
}

impl ServerEnd {
    /// Deliver a raw frame to the client
    pub fn push(&self, frame: &str) {
        let _ = self.to_client.unbounded_send(Ok(frame.to_string()));
    }

    /// Next frame the client sent, or `None` once the client closed
    pub async fn next_sent(&mut self) -> Option<String> {
        self.from_client.next().await
    }

    /// Frames the client has sent so far, without waiting
    pub fn drain_sent(&mut self) -> Vec<String> {
        let mut sent = Vec::new();
        while let Ok(Some(frame)) = self.from_client.try_next() {
            sent.push(frame);
        }
        sent
    }

    /// Close the server side
    pub fn hang_up(self) {}
}

/// Transport whose connections always fail
pub struct FailingTransport;

#[async_trait]
impl Transport for FailingTransport {
    async fn connect(&self, url: &str) -> Result<Frames> {
        Err(Error::Protocol(format!("connection refused: {}", url)))
    }
}

/// Speech service with canned answers
#[derive(Default)]
pub struct MockSpeech {
    /// Transcription result; `None` makes speech-to-text fail
    pub transcript: Option<String>,
    /// Make text-to-speech fail
    pub tts_fails: bool,
    /// Every text-to-speech request, in order
    pub spoken: Arc<Mutex<Vec<(String, Emotion)>>>,
}

impl MockSpeech {
    pub fn transcribing(text: &str) -> Self {
        Self {
            transcript: Some(text.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SpeechService for MockSpeech {
    async fn speech_to_text(&self, _clip: AudioClip) -> vital_api::Result<String> {
        self.transcript
            .clone()
            .ok_or_else(|| vital_api::Error::api(500, "Transcription failed"))
    }

    async fn text_to_speech(&self, text: &str, emotion: Emotion) -> vital_api::Result<AudioClip> {
        self.spoken.lock().push((text.to_string(), emotion));
        if self.tts_fails {
            return Err(vital_api::Error::api(500, "TTS generation failed"));
        }
        Ok(AudioClip::new(text.as_bytes().to_vec(), "audio/mpeg"))
    }
}

/// Microphone that either refuses or records a fixed clip
pub struct MockInput {
    pub deny: bool,
}

struct FixedRecording;

#[async_trait]
impl Recording for FixedRecording {
    async fn finish(self: Box<Self>) -> Result<AudioClip> {
        Ok(AudioClip::new(vec![0x1A, 0x45, 0xDF, 0xA3], "audio/webm"))
    }
}

#[async_trait]
impl AudioInput for MockInput {
    async fn start(&self) -> Result<Box<dyn Recording>> {
        if self.deny {
            return Err(Error::MicrophoneUnavailable("permission denied".to_string()));
        }
        Ok(Box::new(FixedRecording))
    }
}

/// Speaker that records what it played; optionally never finishes
#[derive(Default, Clone)]
pub struct MockOutput {
    pub played: Arc<Mutex<Vec<AudioClip>>>,
    pub blocking: bool,
}

impl MockOutput {
    pub fn blocking() -> Self {
        Self {
            blocking: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl AudioOutput for MockOutput {
    async fn play(&self, clip: AudioClip) -> Result<()> {
        self.played.lock().push(clip);
        if self.blocking {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}
