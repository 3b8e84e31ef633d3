//! /transcript command - show the conversation so far

use super::CommandResult;
use crate::render;
use vital_session::TranscriptStore;

pub struct TranscriptCommand;

impl TranscriptCommand {
    pub fn execute(transcript: &TranscriptStore) -> CommandResult {
        if transcript.is_empty() {
            return CommandResult::Message("(no messages yet)".to_string());
        }

        let lines: Vec<String> = transcript
            .messages()
            .iter()
            .enumerate()
            .map(|(i, message)| format!("{:>3}  {}", i + 1, render::message_line(message)))
            .collect();
        CommandResult::Message(lines.join("\n"))
    }
}
