//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default user id sent when starting conversations
pub const DEFAULT_USER_ID: u64 = 1;

/// Default timeout for REST and speech requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for vital
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the conversation service
    pub server_url: Option<String>,
    /// User id sent when starting conversations
    pub user_id: Option<u64>,
    /// Whether agent turns are spoken aloud
    pub audio_mode: Option<bool>,
    /// Timeout for REST and speech requests, in seconds
    pub request_timeout_secs: Option<u64>,
    /// Audio devices
    #[serde(default)]
    pub audio: AudioConfig,
}

/// Command-backed audio devices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Command that records from the microphone and writes audio to stdout
    pub recorder: Option<Vec<String>>,
    /// Command that plays a file; the file path is appended as last argument
    pub player: Option<Vec<String>>,
    /// Where synthesized clips are written
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vital")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("VITAL_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from a file, falling back to defaults if it is missing or
    /// unreadable
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            server_url: Some(vital_api::DEFAULT_BASE_URL.to_string()),
            user_id: Some(DEFAULT_USER_ID),
            audio_mode: Some(true),
            request_timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            audio: AudioConfig::default(),
        };

        default_config.save_to(&path)?;
        Ok(path)
    }

    pub fn server_url(&self) -> &str {
        self.server_url
            .as_deref()
            .unwrap_or(vital_api::DEFAULT_BASE_URL)
    }

    pub fn user_id(&self) -> u64 {
        self.user_id.unwrap_or(DEFAULT_USER_ID)
    }

    pub fn audio_mode(&self) -> bool {
        self.audio_mode.unwrap_or(true)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Directory for synthesized clips
    pub fn audio_dir(&self) -> PathBuf {
        self.audio.dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("vital")
                .join("audio")
        })
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# vital configuration file
# Place at ~/.config/vital/config.toml (Linux) or set VITAL_CONFIG_PATH

# Base URL of the conversation service (the session channel URL is derived
# from it: http -> ws, https -> wss)
server_url = "http://localhost:8000"

# User id sent when starting conversations
user_id = 1

# Speak agent turns aloud (toggle in a chat with /audio on|off)
audio_mode = true

# Timeout for REST and speech requests, in seconds
request_timeout_secs = 60

[audio]
# Command that records from the microphone to stdout until it is stopped
# recorder = ["arecord", "-q", "-f", "S16_LE", "-r", "16000", "-t", "wav", "-"]

# Command that plays an audio file (the path is appended)
# player = ["mpg123", "-q"]

# Where synthesized clips are written
# dir = "/tmp/vital-audio"
"#
}
