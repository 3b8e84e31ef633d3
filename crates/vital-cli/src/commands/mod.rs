//! Slash commands for interactive chat

mod audio;
mod status;
mod transcript;

pub use audio::AudioCommand;
pub use status::StatusCommand;
pub use transcript::TranscriptCommand;

use vital_session::Session;

/// Result of executing a slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Undo the last exchange
    Redo,
    /// Ask for a coaching hint
    Hint,
    /// Hide the current hint
    DismissHint,
    /// Switch audio mode
    SetAudio(bool),
    /// Start capturing from the microphone
    StartRecording,
    /// Stop capturing and send the transcription
    StopRecording,
    /// Show a message to the user (not sent to the server)
    Message(String),
    /// Leave the conversation
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(input: &str, session: &Session) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let parts: Vec<&str> = rest.splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "redo" | "r" => CommandResult::Redo,

        "hint" => CommandResult::Hint,

        "dismiss" | "d" => CommandResult::DismissHint,

        "audio" | "a" => AudioCommand::execute(args, session.state().audio_mode()),

        "record" | "rec" => CommandResult::StartRecording,

        "stop" => CommandResult::StopRecording,

        "transcript" | "t" => TranscriptCommand::execute(session.state().transcript()),

        "status" | "s" => StatusCommand::execute(session),

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?          Show this help message
  /redo, /r              Undo your last message and the reply to it
  /hint                  Ask for a coaching hint
  /dismiss, /d           Hide the current hint
  /audio, /a [on|off]    Show or switch spoken replies
  /record, /rec          Start recording from the microphone
  /stop                  Stop recording and send what you said
  /transcript, /t        Show the conversation so far
  /status, /s            Show conversation status
  /quit, /exit, /q       Leave the conversation

Anything else you type is sent as your next message."#
        .to_string()
}
