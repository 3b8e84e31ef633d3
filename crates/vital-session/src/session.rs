//! The session driver: routes inbound events, sends user intents, and runs
//! the audio round trips

use std::{collections::VecDeque, sync::Arc};

use async_stream::stream;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use vital_api::{Message, SpeechService};

use crate::{
    audio::{self, AudioInput, AudioOutput, PlaybackState, RecordingState},
    connection::Connection,
    error::{Error, Result},
    events::SessionEvent,
    protocol::{InboundEvent, OutboundIntent},
    state::SessionState,
    transport::Transport,
};

/// Result of a background audio conversion
enum Completion {
    Transcribed(Result<String>),
    PlaybackDone { generation: u64, result: Result<()> },
}

/// One open conversation.
///
/// A session is driven by a single task calling [`Session::next_event`] in a
/// loop, interleaved with calls for user actions. Every state change is
/// reported as a [`SessionEvent`] through `next_event`, including the local
/// echo of sent messages.
pub struct Session {
    state: SessionState,
    connection: Connection,
    speech: Option<Arc<dyn SpeechService>>,
    input: Option<Arc<dyn AudioInput>>,
    output: Option<Arc<dyn AudioOutput>>,
    pending: VecDeque<SessionEvent>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    /// Parent of every playback's cancellation token
    playback_cancel: CancellationToken,
    channel_open: bool,
    closed: bool,
}

impl Session {
    /// Open the session channel for a conversation.
    ///
    /// A failed connection still yields a session; it starts disconnected
    /// and its first event is `Disconnected`.
    pub async fn open(transport: &dyn Transport, url: &str, conversation_id: u64) -> Self {
        let connection = Connection::open(transport, url, conversation_id).await;
        Self::with_connection(connection)
    }

    /// Build a session around an existing connection
    pub fn with_connection(connection: Connection) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let mut state = SessionState::default();
        state.connected = connection.is_connected();

        Self {
            state,
            connection,
            speech: None,
            input: None,
            output: None,
            pending: VecDeque::new(),
            completions_tx,
            completions_rx,
            playback_cancel: CancellationToken::new(),
            channel_open: true,
            closed: false,
        }
    }

    /// Set the initial audio mode (on by default)
    pub fn with_audio_mode(mut self, enabled: bool) -> Self {
        self.state.audio_mode = enabled;
        self
    }

    /// Speech service used for both conversions
    pub fn with_speech(mut self, speech: Arc<dyn SpeechService>) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Microphone for voice input
    pub fn with_audio_input(mut self, input: Arc<dyn AudioInput>) -> Self {
        self.input = Some(input);
        self
    }

    /// Speaker for agent replies
    pub fn with_audio_output(mut self, output: Arc<dyn AudioOutput>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn conversation_id(&self) -> u64 {
        self.connection.conversation_id()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Whether the channel is live right now
    pub fn is_connected(&self) -> bool {
        !self.closed && self.connection.is_connected()
    }

    /// Send a user turn and echo it into the transcript.
    ///
    /// Blank input is ignored. When not connected nothing is sent and the
    /// transcript is left alone.
    pub fn send_message(&mut self, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Ok(());
        }
        self.send(&OutboundIntent::message(content))?;
        let events = self.state.record_message(Message::user(content));
        self.pending.extend(events);
        Ok(())
    }

    /// Undo the last exchange here and on the server.
    ///
    /// Returns how many transcript entries were removed. With fewer than
    /// two entries nothing is sent and nothing is removed.
    pub fn request_redo(&mut self) -> Result<usize> {
        if !self.state.transcript.can_redo() {
            return Ok(0);
        }
        self.send(&OutboundIntent::Redo)?;
        let events = self.state.rewind();
        let removed = events
            .iter()
            .find_map(|e| match e {
                SessionEvent::TranscriptRewound { removed } => Some(*removed),
                _ => None,
            })
            .unwrap_or(0);
        self.pending.extend(events);
        Ok(removed)
    }

    /// Ask the server for a coaching hint; it arrives later as `HintShown`
    pub fn request_hint(&mut self) -> Result<()> {
        self.send(&OutboundIntent::Hint)
    }

    /// Hide the pending hint. Returns whether one was showing.
    pub fn dismiss_hint(&mut self) -> bool {
        match self.state.dismiss_hint() {
            Some(event) => {
                self.pending.push_back(event);
                true
            }
            None => false,
        }
    }

    /// Switch audio mode. Turning it off stops the current playback; the
    /// transcript is untouched either way.
    pub fn set_audio_mode(&mut self, enabled: bool) {
        if self.state.audio_mode == enabled {
            return;
        }
        self.state.audio_mode = enabled;
        self.pending
            .push_back(SessionEvent::AudioModeChanged { enabled });

        if !enabled && self.state.playback.interrupt() {
            self.pending.push_back(SessionEvent::PlaybackStateChanged {
                state: PlaybackState::Idle,
            });
        }
    }

    /// `idle → recording`. A microphone failure leaves capture idle and is
    /// reported as an `Error` event as well as returned.
    pub async fn start_recording(&mut self) -> Result<()> {
        self.state.capture.ensure_idle()?;

        let result = match (&self.input, &self.speech) {
            (Some(input), Some(_)) => input.start().await,
            (None, _) => Err(Error::MicrophoneUnavailable(
                "no audio input configured".to_string(),
            )),
            (_, None) => Err(Error::MicrophoneUnavailable(
                "no speech service configured".to_string(),
            )),
        };

        match result {
            Ok(recording) => {
                self.state.capture.begin(recording)?;
                self.pending.push_back(SessionEvent::RecordingStateChanged {
                    state: RecordingState::Recording,
                });
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Could not start recording: {}", e);
                self.pending.push_back(SessionEvent::Error {
                    message: format!("Microphone access failed: {}", e),
                });
                Err(e)
            }
        }
    }

    /// `recording → transcribing`. The transcription runs in the background;
    /// its outcome arrives through `next_event`.
    pub fn stop_recording(&mut self) -> Result<()> {
        let speech = self
            .speech
            .clone()
            .ok_or_else(|| Error::InvalidTransition("no speech service configured".to_string()))?;
        let recording = self.state.capture.stop()?;
        self.pending.push_back(SessionEvent::RecordingStateChanged {
            state: RecordingState::Transcribing,
        });

        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = audio::transcribe(recording, speech.as_ref()).await;
            // The session may be gone by now; the result is then dropped.
            let _ = tx.send(Completion::Transcribed(result));
        });
        Ok(())
    }

    /// Next event, after the state it describes has been applied.
    ///
    /// Returns `None` once the channel is closed and no audio conversion is
    /// still in flight, or after [`Session::close`].
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if self.closed {
                return None;
            }
            if !self.channel_open && !self.has_audio_in_flight() {
                return None;
            }

            tokio::select! {
                inbound = self.connection.next_event(), if self.channel_open => match inbound {
                    Some(event) => self.apply_inbound(event),
                    None => {
                        self.channel_open = false;
                        self.state.connected = false;
                        self.pending.push_back(SessionEvent::Disconnected);
                    }
                },
                Some(done) = self.completions_rx.recv() => self.apply_completion(done),
                else => return None,
            }
        }
    }

    /// Events as a stream; ends under the same conditions as `next_event`
    pub fn events(&mut self) -> impl Stream<Item = SessionEvent> + '_ {
        stream! {
            while let Some(event) = self.next_event().await {
                yield event;
            }
        }
    }

    /// Tear the session down: close the channel, stop playback, and discard
    /// state. In-flight transcriptions are not awaited. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.playback_cancel.cancel();
        self.connection.close();
        self.state.teardown();
        self.pending.clear();
    }

    fn send(&mut self, intent: &OutboundIntent) -> Result<()> {
        if self.closed {
            return Err(Error::NotConnected);
        }
        let result = self.connection.send(intent);
        if matches!(result, Err(Error::NotConnected)) {
            self.state.connected = false;
        }
        result
    }

    fn has_audio_in_flight(&self) -> bool {
        self.state.recording_state() == RecordingState::Transcribing
            || self.state.playback_state() == PlaybackState::Playing
    }

    fn apply_inbound(&mut self, event: InboundEvent) {
        tracing::debug!("Inbound {} event", event.kind());
        match event {
            InboundEvent::Hint { content, quality } => {
                let event = self.state.show_hint(content, quality);
                self.pending.push_back(event);
            }
            InboundEvent::System { content, status } => {
                self.pending
                    .push_back(SessionEvent::SystemNotice { content, status });
            }
            InboundEvent::Warning { content } => {
                self.pending.push_back(SessionEvent::SystemNotice {
                    content,
                    status: Some("warning".to_string()),
                });
            }
            InboundEvent::Chat(message) => {
                let speak = message.is_agent()
                    && self.state.audio_mode
                    && !message.content.trim().is_empty();
                let events = self.state.record_message(message.clone());
                self.pending.extend(events);
                if speak {
                    self.start_playback(&message);
                }
            }
        }
    }

    fn start_playback(&mut self, message: &Message) {
        let (Some(speech), Some(output)) = (self.speech.clone(), self.output.clone()) else {
            tracing::debug!("Audio mode is on but no speech output is configured");
            return;
        };

        let ticket = self.state.playback.begin(&self.playback_cancel);
        if ticket.interrupted {
            tracing::debug!("Interrupting playback for a newer agent turn");
        } else {
            self.pending.push_back(SessionEvent::PlaybackStateChanged {
                state: PlaybackState::Playing,
            });
        }

        let text = message.content.clone();
        let emotion = message.emotion_or_neutral();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = audio::speak(
                &text,
                emotion,
                speech.as_ref(),
                output.as_ref(),
                &ticket.cancel,
            )
            .await;
            let _ = tx.send(Completion::PlaybackDone {
                generation: ticket.generation,
                result,
            });
        });
    }

    fn apply_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Transcribed(result) => {
                if let Err(e) = self.state.capture.finish() {
                    tracing::warn!("Transcription finished in unexpected state: {}", e);
                }
                self.pending.push_back(SessionEvent::RecordingStateChanged {
                    state: RecordingState::Idle,
                });

                match result {
                    Ok(text) => {
                        if let Err(e) = self.send_message(&text) {
                            self.pending.push_back(SessionEvent::Error {
                                message: format!("Could not send transcribed message: {}", e),
                            });
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Transcription failed: {}", e);
                        self.pending.push_back(SessionEvent::Error {
                            message: format!("Failed to process audio: {}", e),
                        });
                    }
                }
            }
            Completion::PlaybackDone { generation, result } => {
                match result {
                    Ok(()) => {}
                    Err(Error::Cancelled) => tracing::debug!("Playback {} cancelled", generation),
                    // Playback failures are not shown to the user.
                    Err(e) => tracing::warn!("Playback failed: {}", e),
                }
                if self.state.playback.complete(generation) {
                    self.pending.push_back(SessionEvent::PlaybackStateChanged {
                        state: PlaybackState::Idle,
                    });
                }
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingTransport, MockInput, MockOutput, MockSpeech, MockTransport, ServerEnd};
    use futures::StreamExt;
    use vital_api::{Emotion, Role};

    async fn open_session() -> (Session, ServerEnd) {
        let (transport, server) = MockTransport::pair();
        let session = Session::open(&transport, "ws://test", 1001).await;
        (session, server)
    }

    /// Pull events until one matches, returning everything seen
    async fn events_until(
        session: &mut Session,
        done: impl Fn(&SessionEvent) -> bool,
    ) -> Vec<SessionEvent> {
        let mut seen = Vec::new();
        while let Some(event) = session.next_event().await {
            let stop = done(&event);
            seen.push(event);
            if stop {
                break;
            }
        }
        seen
    }

    #[tokio::test]
    async fn test_chat_events_append_in_order() {
        let (session, server) = open_session().await;
        let mut session = session.with_audio_mode(false);

        for i in 0..5 {
            server.push(&format!(r#"{{"role":"agent","content":"turn {}"}}"#, i));
        }
        server.hang_up();

        let events: Vec<_> = session.events().collect().await;
        let appended = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::MessageAppended { .. }))
            .count();
        assert_eq!(appended, 5);
        assert_eq!(events.last(), Some(&SessionEvent::Disconnected));

        let contents: Vec<_> = session
            .state()
            .transcript()
            .messages()
            .iter()
            .map(|m| m.content.clone())
            .collect();
        assert_eq!(contents, vec!["turn 0", "turn 1", "turn 2", "turn 3", "turn 4"]);
        assert!(!session.state().connected());
    }

    #[tokio::test]
    async fn test_emotion_follows_latest_agent_turn() {
        let (session, server) = open_session().await;
        let mut session = session.with_audio_mode(false);

        server.push(r#"{"role":"agent","content":"How dare you","emotional_state":"anger"}"#);
        server.push(r#"{"role":"agent","content":"I just...","emotional_state":"sadness"}"#);
        server.hang_up();

        while session.next_event().await.is_some() {}
        assert_eq!(session.state().current_emotion(), Emotion::Sadness);
    }

    #[tokio::test]
    async fn test_hint_event_sets_pending_hint() {
        let (mut session, server) = open_session().await;
        server.push(r#"{"type":"hint","content":"Try naming the emotion"}"#);

        let event = session.next_event().await;
        assert_eq!(
            event,
            Some(SessionEvent::HintShown {
                content: "Try naming the emotion".into(),
                quality: None
            })
        );
        assert_eq!(session.state().visible_hint(), Some("Try naming the emotion"));
        assert!(session.state().transcript().is_empty());

        assert!(session.dismiss_hint());
        assert_eq!(session.next_event().await, Some(SessionEvent::HintDismissed));
        assert!(!session.dismiss_hint());
    }

    #[tokio::test]
    async fn test_system_notice_not_in_transcript() {
        let (mut session, server) = open_session().await;
        server.push(r#"{"type":"system","content":"Last turn has been undone.","status":"rewound"}"#);

        let event = session.next_event().await.unwrap();
        assert!(event.is_blocking_notice());
        assert!(session.state().transcript().is_empty());
    }

    #[tokio::test]
    async fn test_safety_warning_is_shown_as_notice() {
        let (session, mut server) = open_session().await;
        let mut session = session.with_audio_mode(false);

        session.send_message("something hurtful").unwrap();
        server.push(
            r#"{"role":"system","content":"Please keep the conversation respectful.","type":"warning"}"#,
        );

        let seen = events_until(&mut session, |e| {
            matches!(e, SessionEvent::SystemNotice { .. })
        })
        .await;
        assert_eq!(
            seen.last(),
            Some(&SessionEvent::SystemNotice {
                content: "Please keep the conversation respectful.".into(),
                status: Some("warning".into())
            })
        );
        assert!(seen.last().is_some_and(SessionEvent::is_blocking_notice));
        // Only the local echo is in the transcript
        assert_eq!(session.state().transcript().len(), 1);
        assert_eq!(
            server.next_sent().await.as_deref(),
            Some(r#"{"type":"message","content":"something hurtful"}"#)
        );
    }

    #[tokio::test]
    async fn test_send_message_echoes_and_writes_frame() {
        let (mut session, mut server) = open_session().await;

        session.send_message("Hello").unwrap();
        assert_eq!(
            session.next_event().await,
            Some(SessionEvent::MessageAppended {
                message: Message::user("Hello")
            })
        );
        assert_eq!(
            server.next_sent().await.as_deref(),
            Some(r#"{"type":"message","content":"Hello"}"#)
        );
    }

    #[tokio::test]
    async fn test_blank_message_is_ignored() {
        let (mut session, mut server) = open_session().await;
        session.send_message("   ").unwrap();
        assert!(session.state().transcript().is_empty());
        session.close();
        assert_eq!(server.next_sent().await, None);
    }

    #[tokio::test]
    async fn test_send_while_disconnected_is_rejected() {
        let mut session = Session::open(&FailingTransport, "ws://nowhere", 1).await;
        assert!(!session.is_connected());
        assert_eq!(session.next_event().await, Some(SessionEvent::Disconnected));

        let err = session.send_message("Hello").unwrap_err();
        assert!(matches!(err, Error::NotConnected));
        assert!(session.state().transcript().is_empty());
        assert!(matches!(session.request_hint(), Err(Error::NotConnected)));
        assert_eq!(session.next_event().await, None);
    }

    #[tokio::test]
    async fn test_redo_removes_last_exchange() {
        let (session, mut server) = open_session().await;
        let mut session = session.with_audio_mode(false);

        server.push(r#"{"role":"agent","content":"greeting"}"#);
        events_until(&mut session, |e| matches!(e, SessionEvent::MessageAppended { .. })).await;

        session.send_message("That's hard news").unwrap();
        server.push(r#"{"role":"agent","content":"No!","emotional_state":"anger"}"#);
        // The labelled reply is followed by its emotion change
        let seen = events_until(&mut session, |e| {
            matches!(e, SessionEvent::EmotionChanged { .. })
        })
        .await;
        assert!(seen.iter().any(
            |e| matches!(e, SessionEvent::MessageAppended { message } if message.role == Role::Agent)
        ));
        assert_eq!(session.state().transcript().len(), 3);

        assert_eq!(session.request_redo().unwrap(), 2);
        assert_eq!(
            session.next_event().await,
            Some(SessionEvent::TranscriptRewound { removed: 2 })
        );
        assert_eq!(
            session.next_event().await,
            Some(SessionEvent::EmotionChanged {
                emotion: Emotion::Neutral
            })
        );
        assert_eq!(session.state().transcript().messages(), &[Message::agent("greeting")]);

        let sent = {
            let mut sent = Vec::new();
            while sent.len() < 2 {
                match server.next_sent().await {
                    Some(frame) => sent.push(frame),
                    None => break,
                }
            }
            sent
        };
        assert_eq!(sent[1], r#"{"type":"redo"}"#);
    }

    #[tokio::test]
    async fn test_redo_below_threshold_sends_nothing() {
        let (session, mut server) = open_session().await;
        let mut session = session.with_audio_mode(false);
        server.push(r#"{"role":"agent","content":"greeting"}"#);
        session.next_event().await;

        assert_eq!(session.request_redo().unwrap(), 0);
        assert_eq!(session.state().transcript().len(), 1);
        assert!(server.drain_sent().is_empty());
    }

    #[tokio::test]
    async fn test_agent_turn_is_spoken_in_audio_mode() {
        let (session, server) = open_session().await;
        let speech = Arc::new(MockSpeech::default());
        let output = MockOutput::default();
        let mut session = session
            .with_speech(speech.clone())
            .with_audio_output(Arc::new(output.clone()));

        server.push(r#"{"role":"agent","content":"Is it my fault?","emotional_state":"bargaining"}"#);

        let events = events_until(&mut session, |e| {
            *e == SessionEvent::PlaybackStateChanged {
                state: PlaybackState::Idle,
            }
        })
        .await;
        assert!(events.contains(&SessionEvent::PlaybackStateChanged {
            state: PlaybackState::Playing
        }));
        assert_eq!(
            speech.spoken.lock().as_slice(),
            &[("Is it my fault?".to_string(), Emotion::Bargaining)]
        );
        assert_eq!(output.played.lock().len(), 1);
        assert_eq!(session.state().playback_state(), PlaybackState::Idle);
    }

    #[tokio::test]
    async fn test_no_playback_when_audio_mode_off() {
        let (session, server) = open_session().await;
        let speech = Arc::new(MockSpeech::default());
        let mut session = session
            .with_audio_mode(false)
            .with_speech(speech.clone())
            .with_audio_output(Arc::new(MockOutput::default()));

        server.push(r#"{"role":"agent","content":"Hello doctor"}"#);
        server.hang_up();
        while session.next_event().await.is_some() {}

        assert!(speech.spoken.lock().is_empty());
        assert_eq!(session.state().transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_user_turns_are_not_spoken() {
        let (session, server) = open_session().await;
        let speech = Arc::new(MockSpeech::default());
        let mut session = session
            .with_speech(speech.clone())
            .with_audio_output(Arc::new(MockOutput::default()));

        server.push(r#"{"role":"user","content":"echoed by server"}"#);
        server.hang_up();
        while session.next_event().await.is_some() {}

        assert!(speech.spoken.lock().is_empty());
    }

    #[tokio::test]
    async fn test_playback_failure_is_silent() {
        let (session, server) = open_session().await;
        let speech = Arc::new(MockSpeech {
            tts_fails: true,
            ..Default::default()
        });
        let mut session = session
            .with_speech(speech)
            .with_audio_output(Arc::new(MockOutput::default()));

        server.push(r#"{"role":"agent","content":"..."}"#);
        let events = events_until(&mut session, |e| {
            *e == SessionEvent::PlaybackStateChanged {
                state: PlaybackState::Idle,
            }
        })
        .await;
        assert!(!events.iter().any(|e| matches!(e, SessionEvent::Error { .. })));
    }

    #[tokio::test]
    async fn test_newer_agent_turn_interrupts_playback() {
        let (session, server) = open_session().await;
        let speech = Arc::new(MockSpeech::default());
        let output = MockOutput::blocking();
        let mut session = session
            .with_speech(speech.clone())
            .with_audio_output(Arc::new(output.clone()));

        server.push(r#"{"role":"agent","content":"first"}"#);
        events_until(&mut session, |e| {
            matches!(e, SessionEvent::PlaybackStateChanged { state: PlaybackState::Playing })
        })
        .await;

        server.push(r#"{"role":"agent","content":"second"}"#);
        events_until(&mut session, |e| matches!(e, SessionEvent::MessageAppended { .. })).await;
        assert_eq!(session.state().playback_state(), PlaybackState::Playing);

        session.set_audio_mode(false);
        assert_eq!(
            session.next_event().await,
            Some(SessionEvent::AudioModeChanged { enabled: false })
        );
        assert_eq!(
            session.next_event().await,
            Some(SessionEvent::PlaybackStateChanged {
                state: PlaybackState::Idle
            })
        );
        assert_eq!(session.state().transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_voice_input_round_trip() {
        let (session, mut server) = open_session().await;
        let mut session = session
            .with_audio_mode(false)
            .with_speech(Arc::new(MockSpeech::transcribing("I'm so sorry.")))
            .with_audio_input(Arc::new(MockInput { deny: false }));

        session.start_recording().await.unwrap();
        assert_eq!(session.state().recording_state(), RecordingState::Recording);
        assert!(session.start_recording().await.is_err());

        session.stop_recording().unwrap();
        assert_eq!(session.state().recording_state(), RecordingState::Transcribing);

        let events = events_until(&mut session, |e| matches!(e, SessionEvent::MessageAppended { .. })).await;
        assert_eq!(
            events,
            vec![
                SessionEvent::RecordingStateChanged {
                    state: RecordingState::Recording
                },
                SessionEvent::RecordingStateChanged {
                    state: RecordingState::Transcribing
                },
                SessionEvent::RecordingStateChanged {
                    state: RecordingState::Idle
                },
                SessionEvent::MessageAppended {
                    message: Message::user("I'm so sorry.")
                },
            ]
        );
        assert_eq!(
            server.next_sent().await.as_deref(),
            Some(r#"{"type":"message","content":"I'm so sorry."}"#)
        );
    }

    #[tokio::test]
    async fn test_microphone_denied_returns_to_idle() {
        let (session, _server) = open_session().await;
        let mut session = session
            .with_speech(Arc::new(MockSpeech::default()))
            .with_audio_input(Arc::new(MockInput { deny: true }));

        let err = session.start_recording().await.unwrap_err();
        assert!(matches!(err, Error::MicrophoneUnavailable(_)));
        assert_eq!(session.state().recording_state(), RecordingState::Idle);
        assert!(matches!(
            session.next_event().await,
            Some(SessionEvent::Error { .. })
        ));
        assert!(matches!(
            session.stop_recording(),
            Err(Error::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_transcription_failure_sends_nothing() {
        let (session, mut server) = open_session().await;
        let mut session = session
            .with_speech(Arc::new(MockSpeech::default()))
            .with_audio_input(Arc::new(MockInput { deny: false }));

        session.start_recording().await.unwrap();
        session.stop_recording().unwrap();
        let events = events_until(&mut session, |e| matches!(e, SessionEvent::Error { .. })).await;

        assert!(events.contains(&SessionEvent::RecordingStateChanged {
            state: RecordingState::Idle
        }));
        assert_eq!(session.state().recording_state(), RecordingState::Idle);
        assert!(session.state().transcript().is_empty());
        assert!(server.drain_sent().is_empty());
    }

    #[tokio::test]
    async fn test_transcription_after_disconnect_still_settles() {
        let (session, server) = open_session().await;
        let mut session = session
            .with_speech(Arc::new(MockSpeech::transcribing("hello?")))
            .with_audio_input(Arc::new(MockInput { deny: false }));

        session.start_recording().await.unwrap();
        session.stop_recording().unwrap();
        server.hang_up();

        let events: Vec<_> = session.events().collect().await;
        assert!(events.contains(&SessionEvent::Disconnected));
        assert!(events.contains(&SessionEvent::RecordingStateChanged {
            state: RecordingState::Idle
        }));
        assert_eq!(session.state().recording_state(), RecordingState::Idle);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (mut session, mut server) = open_session().await;
        session.send_message("bye").unwrap();
        session.close();
        session.close();

        assert!(!session.is_connected());
        assert_eq!(session.next_event().await, None);
        assert!(session.state().transcript().is_empty());
        assert!(matches!(session.send_message("again"), Err(Error::NotConnected)));

        assert_eq!(
            server.next_sent().await.as_deref(),
            Some(r#"{"type":"message","content":"bye"}"#)
        );
        assert_eq!(server.next_sent().await, None);
    }
}
