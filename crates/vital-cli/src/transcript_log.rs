//! Transcript log: one JSONL file per conversation

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use vital_api::Message;
use vital_session::SessionEvent;

/// Log entry types for JSONL format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEntry {
    /// Written once, when the file is created
    Metadata {
        conversation_id: u64,
        created_at: i64,
        server_url: String,
    },
    /// The channel was (re)joined; the server starts over with a greeting
    Joined { timestamp: i64 },
    /// A turn added to the transcript
    Message { message: Message, timestamp: i64 },
    /// The last `removed` turns were undone
    Rewind { removed: usize, timestamp: i64 },
    /// A server notice shown to the user
    Notice {
        content: String,
        #[serde(default)]
        status: Option<String>,
        timestamp: i64,
    },
}

/// Appends transcript changes for one conversation
pub struct TranscriptLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl TranscriptLog {
    /// Get the transcripts directory
    pub fn transcripts_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vital")
            .join("transcripts")
    }

    /// Path of the log for a conversation inside `dir`
    pub fn path_in(dir: &Path, conversation_id: u64) -> PathBuf {
        dir.join(format!("conversation-{}.jsonl", conversation_id))
    }

    /// Open the log for a conversation in the default directory
    pub fn open(conversation_id: u64, server_url: &str) -> std::io::Result<Self> {
        Self::open_in(&Self::transcripts_dir(), conversation_id, server_url)
    }

    /// Open (or continue) the log for a conversation inside `dir`.
    ///
    /// Every open starts a new join section.
    pub fn open_in(dir: &Path, conversation_id: u64, server_url: &str) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = Self::path_in(dir, conversation_id);
        let is_new = !path.exists();

        let file = File::options().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);

        let now = chrono::Utc::now().timestamp_millis();
        if is_new {
            let metadata = LogEntry::Metadata {
                conversation_id,
                created_at: now,
                server_url: server_url.to_string(),
            };
            writeln!(writer, "{}", serde_json::to_string(&metadata)?)?;
        }
        let joined = LogEntry::Joined { timestamp: now };
        writeln!(writer, "{}", serde_json::to_string(&joined)?)?;
        writer.flush()?;

        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a session event if it changes what the user saw
    pub fn record(&mut self, event: &SessionEvent) -> std::io::Result<()> {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let entry = match event {
            SessionEvent::MessageAppended { message } => LogEntry::Message {
                message: message.clone(),
                timestamp,
            },
            SessionEvent::TranscriptRewound { removed } => LogEntry::Rewind {
                removed: *removed,
                timestamp,
            },
            SessionEvent::SystemNotice { content, status } => LogEntry::Notice {
                content: content.clone(),
                status: status.clone(),
                timestamp,
            },
            _ => return Ok(()),
        };
        writeln!(self.writer, "{}", serde_json::to_string(&entry)?)?;
        self.writer.flush()
    }

    /// Rebuild the transcript of each join from a log, applying rewinds
    pub fn replay(path: &Path) -> std::io::Result<Vec<Vec<Message>>> {
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Transcript not found: {}", path.display()),
            ));
        }

        let reader = BufReader::new(File::open(path)?);
        let mut joins: Vec<Vec<Message>> = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEntry>(&line) {
                Ok(LogEntry::Joined { .. }) => joins.push(Vec::new()),
                Ok(LogEntry::Message { message, .. }) => match joins.last_mut() {
                    Some(messages) => messages.push(message),
                    None => joins.push(vec![message]),
                },
                Ok(LogEntry::Rewind { removed, .. }) => {
                    if let Some(messages) = joins.last_mut() {
                        let keep = messages.len().saturating_sub(removed);
                        messages.truncate(keep);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping malformed transcript line: {}", e),
            }
        }

        joins.retain(|messages| !messages.is_empty());
        Ok(joins)
    }
}
