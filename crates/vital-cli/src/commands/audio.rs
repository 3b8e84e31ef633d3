//! /audio command - show and switch spoken replies

use super::CommandResult;

pub struct AudioCommand;

impl AudioCommand {
    /// With no argument, toggles the current mode
    pub fn execute(args: &str, current: bool) -> CommandResult {
        if args.is_empty() {
            return CommandResult::SetAudio(!current);
        }
        match parse_mode(args) {
            Some(enabled) => CommandResult::SetAudio(enabled),
            None => CommandResult::Message(format!(
                "Unknown audio mode: '{}'\nAudio is currently {}. Use: /audio on | /audio off",
                args,
                if current { "on" } else { "off" }
            )),
        }
    }
}

fn parse_mode(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => Some(true),
        "off" | "no" | "false" | "0" | "mute" => Some(false),
        _ => None,
    }
}
