//! /status command - show conversation state

use super::CommandResult;
use vital_session::{PlaybackState, RecordingState, Session};

pub struct StatusCommand;

impl StatusCommand {
    pub fn execute(session: &Session) -> CommandResult {
        let state = session.state();

        let mut output = String::from("Conversation Status\n");
        output.push_str(&"-".repeat(40));
        output.push('\n');

        output.push_str(&format!("Conversation: {}\n", session.conversation_id()));
        output.push_str(&format!(
            "Channel:      {}\n",
            if session.is_connected() {
                "connected"
            } else {
                "disconnected"
            }
        ));
        output.push_str(&format!("Emotion:      {}\n", state.current_emotion().label()));
        output.push('\n');

        let (user, agent, system) = state.transcript().role_counts();
        output.push_str(&format!("Messages:     {} total\n", state.transcript().len()));
        output.push_str(&format!(
            "              {} yours, {} agent, {} system\n",
            user, agent, system
        ));
        output.push('\n');

        output.push_str(&format!(
            "Audio:        {}\n",
            if state.audio_mode() { "on" } else { "off" }
        ));
        output.push_str(&format!(
            "Microphone:   {}\n",
            match state.recording_state() {
                RecordingState::Idle => "idle",
                RecordingState::Recording => "recording",
                RecordingState::Transcribing => "transcribing",
            }
        ));
        output.push_str(&format!(
            "Playback:     {}\n",
            match state.playback_state() {
                PlaybackState::Idle => "idle",
                PlaybackState::Playing => "playing",
            }
        ));

        if let Some(hint) = state.visible_hint() {
            output.push_str(&format!("\nHint: {}\n", hint));
        }

        CommandResult::Message(output)
    }
}
