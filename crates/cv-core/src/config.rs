//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for server, auth, tools, and transcoding. Every section
//! defaults sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub tools: ToolsConfig,
    pub transcode: TranscodeConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    ///
    /// This is intentionally string-based so the caller can read the file
    /// however it sees fit (async, embedded, etc.).
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    ///
    /// A missing token secret is reported here as a warning; the server
    /// refuses to start without one (that check lives in cv-server).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self
            .auth
            .token_secret
            .as_deref()
            .unwrap_or("")
            .is_empty()
        {
            warnings.push(
                "auth.token_secret is not set; the server will refuse to start".into(),
            );
        }

        if self.auth.token_ttl_hours == 0 {
            warnings.push("auth.token_ttl_hours is 0; every issued token is already expired".into());
        }

        if self.transcode.enabled {
            if self.transcode.video_codec.is_empty() {
                warnings.push("transcode.video_codec is empty".into());
            }
            if self.transcode.audio_codec.is_empty() {
                warnings.push("transcode.audio_codec is empty".into());
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Directory where raw and transcoded artifacts are written.
    pub uploads_dir: PathBuf,
    /// Maximum accepted upload size in megabytes.
    pub max_upload_mb: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            db_path: PathBuf::from("./data/clipvault.db"),
            uploads_dir: PathBuf::from("./data/uploads"),
            max_upload_mb: 512,
        }
    }
}

/// Authentication settings.
///
/// Tokens are stateless signed claims; `token_secret` is the HMAC signing
/// key and must be set for the server to start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token_secret: Option<String>,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_hours: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: None,
            token_ttl_hours: default_token_ttl(),
        }
    }
}

fn default_token_ttl() -> u64 {
    1
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Transcode settings for the post-upload normalization pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    pub enabled: bool,
    #[serde(default = "default_video_codec")]
    pub video_codec: String,
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    #[serde(default = "default_transcode_timeout")]
    pub timeout_secs: u64,
}

fn default_video_codec() -> String {
    "libx264".into()
}
fn default_audio_codec() -> String {
    "aac".into()
}
fn default_transcode_timeout() -> u64 {
    3600
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            timeout_secs: default_transcode_timeout(),
        }
    }
}
