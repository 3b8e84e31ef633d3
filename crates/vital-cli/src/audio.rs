//! Command-backed audio devices
//!
//! The microphone is an external recorder writing audio to stdout; the
//! speaker is an external player given a file path. Both are configured as
//! argv lists in the config file.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use vital_api::AudioClip;
use vital_session::{AudioInput, AudioOutput, Error, Recording, Result};

/// Container type produced by the recorder
const RECORDER_MIME_TYPE: &str = "audio/wav";

/// Microphone backed by a recorder command
pub struct CommandRecorder {
    argv: Vec<String>,
}

impl CommandRecorder {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

struct CommandRecording {
    child: Child,
    reader: JoinHandle<std::io::Result<Vec<u8>>>,
}

#[async_trait]
impl AudioInput for CommandRecorder {
    async fn start(&self) -> Result<Box<dyn Recording>> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| Error::MicrophoneUnavailable("recorder command is empty".to_string()))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::MicrophoneUnavailable(format!("failed to start {}: {}", program, e)))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::MicrophoneUnavailable("recorder has no output".to_string()))?;

        let reader = tokio::spawn(async move {
            let mut data = Vec::new();
            stdout.read_to_end(&mut data).await?;
            Ok(data)
        });

        tracing::debug!("Recording with {}", program);
        Ok(Box::new(CommandRecording { child, reader }))
    }
}

#[async_trait]
impl Recording for CommandRecording {
    async fn finish(self: Box<Self>) -> Result<AudioClip> {
        let CommandRecording { mut child, reader } = *self;

        if let Err(e) = child.start_kill() {
            tracing::debug!("Recorder already exited: {}", e);
        }
        if let Err(e) = child.wait().await {
            tracing::warn!("Failed to reap recorder: {}", e);
        }

        let data = reader
            .await
            .map_err(|e| Error::Audio(format!("recorder reader failed: {}", e)))?
            .map_err(|e| Error::Audio(format!("failed to read recording: {}", e)))?;

        Ok(AudioClip::new(data, RECORDER_MIME_TYPE))
    }
}

/// Speaker that writes clips to a directory and optionally runs a player
pub struct CommandPlayer {
    argv: Option<Vec<String>>,
    dir: PathBuf,
    counter: AtomicU64,
}

impl CommandPlayer {
    pub fn new(argv: Option<Vec<String>>, dir: PathBuf) -> Self {
        Self {
            argv: argv.filter(|a| !a.is_empty()),
            dir,
            counter: AtomicU64::new(0),
        }
    }

    fn next_path(&self, clip: &AudioClip) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(
            "reply-{}-{}.{}",
            chrono::Utc::now().format("%Y%m%d%H%M%S"),
            n,
            clip.extension()
        ))
    }
}

#[async_trait]
impl AudioOutput for CommandPlayer {
    async fn play(&self, clip: AudioClip) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::Audio(format!("cannot create {}: {}", self.dir.display(), e)))?;

        let path = self.next_path(&clip);
        tokio::fs::write(&path, &clip.data)
            .await
            .map_err(|e| Error::Audio(format!("cannot write {}: {}", path.display(), e)))?;

        let Some((program, args)) = self.argv.as_ref().and_then(|a| a.split_first()) else {
            tracing::info!("Saved agent reply audio to {}", path.display());
            return Ok(());
        };

        // Dropping the child (on interruption) kills the player.
        let mut child = Command::new(program)
            .args(args)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Audio(format!("failed to start {}: {}", program, e)))?;

        let status = child
            .wait()
            .await
            .map_err(|e| Error::Audio(format!("player failed: {}", e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::Audio(format!("{} exited with {}", program, status)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_missing_recorder_is_unavailable() {
        let recorder = CommandRecorder::new(argv(&["/nonexistent/vital-recorder"]));
        let err = recorder.start().await.err().unwrap();
        assert!(matches!(err, Error::MicrophoneUnavailable(_)));

        let empty = CommandRecorder::new(Vec::new());
        assert!(matches!(
            empty.start().await.err().unwrap(),
            Error::MicrophoneUnavailable(_)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_recorder_collects_stdout_until_stopped() {
        let recorder = CommandRecorder::new(argv(&["sh", "-c", "printf RIFFdata; exec sleep 30"]));
        let recording = recorder.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let clip = tokio::time::timeout(Duration::from_secs(5), recording.finish())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(clip.data, b"RIFFdata".to_vec());
        assert_eq!(clip.mime_type, "audio/wav");
    }

    #[tokio::test]
    async fn test_player_without_command_saves_clip() {
        let dir = tempfile::tempdir().unwrap();
        let player = CommandPlayer::new(None, dir.path().join("audio"));
        player
            .play(AudioClip::new(vec![0xFF, 0xFB], "audio/mpeg"))
            .await
            .unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path().join("audio"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].extension().and_then(|e| e.to_str()), Some("mp3"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_player_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let clip = AudioClip::new(vec![1, 2, 3], "audio/mpeg");

        let ok = CommandPlayer::new(Some(argv(&["true"])), dir.path().to_path_buf());
        ok.play(clip.clone()).await.unwrap();

        let failing = CommandPlayer::new(Some(argv(&["false"])), dir.path().to_path_buf());
        assert!(matches!(failing.play(clip).await, Err(Error::Audio(_))));
    }
}
