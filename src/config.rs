// Persisted upload settings. Stored as JSON in the operator's home
// directory; every key is optional and falls back to its default on its
// own, and a broken file never stops the program from starting.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{UploaderError, UploaderResult};

/// Largest file sent through the video route.
pub const MAX_VIDEO_SIZE: u64 = 50 * 1024 * 1024;
/// Largest file sent at all.
pub const MAX_DOCUMENT_SIZE: u64 = 2 * 1024 * 1024 * 1024;
/// Connect / read / write / pool timeout of the transport.
pub const TRANSPORT_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest pause allowed between two files, in seconds.
pub const MAX_UPLOAD_DELAY_SECS: f64 = 3600.0;

pub const CONFIG_FILE_NAME: &str = ".telegram_uploader_config.json";

/// How files are routed to the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadTypeMode {
    /// Video route for small videos, document route for everything else.
    #[default]
    Auto,
    /// Video route only; non-video files fail.
    #[serde(rename = "video", alias = "force_video")]
    ForceVideo,
    /// Document route for everything.
    #[serde(rename = "document", alias = "force_document")]
    ForceDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    #[serde(rename = "default_upload_type")]
    pub upload_type: UploadTypeMode,
    /// `{filename}` and `{size}` are substituted per file.
    #[serde(rename = "default_caption")]
    pub caption_template: String,
    /// Pause between two files, in seconds.
    #[serde(rename = "upload_delay")]
    pub upload_delay_secs: f64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig {
            upload_type: UploadTypeMode::Auto,
            caption_template: "📦 {filename}\n💾 Size: {size}".to_string(),
            upload_delay_secs: 2.0,
        }
    }
}

/// `~/.telegram_uploader_config.json`, or the current directory when no
/// home directory is known.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_FILE_NAME)
}

impl UploadConfig {
    /// Read the config file. `Ok(None)` when it does not exist.
    pub fn try_load(path: &Path) -> UploaderResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| UploaderError::Config(format!("reading {}: {e}", path.display())))?;
        let config: UploadConfig = serde_json::from_str(&raw)
            .map_err(|e| UploaderError::Config(format!("parsing {}: {e}", path.display())))?;
        Ok(Some(config.sanitized()))
    }

    /// Like `try_load`, but any problem degrades to the defaults.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(Some(config)) => config,
            Ok(None) => {
                tracing::debug!("no config at {}, using defaults", path.display());
                Self::default()
            }
            Err(err) => {
                tracing::warn!("{err} (using defaults)");
                Self::default()
            }
        }
    }

    /// Load the config, writing a default file first if none exists yet.
    /// Failing to write is logged and otherwise ignored.
    pub fn load_or_init(path: &Path) -> Self {
        let config = Self::load(path);
        if !path.exists() {
            match config.save(path) {
                Ok(()) => tracing::info!("wrote default config to {}", path.display()),
                Err(err) => tracing::warn!("could not write default config: {err}"),
            }
        }
        config
    }

    pub fn save(&self, path: &Path) -> UploaderResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| UploaderError::Config(format!("serializing config: {e}")))?;
        std::fs::write(path, json)
            .map_err(|e| UploaderError::Config(format!("writing {}: {e}", path.display())))
    }

    /// Zero when the value does not fit in a `Duration`.
    pub fn inter_file_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.upload_delay_secs).unwrap_or_else(|_| {
            tracing::warn!("upload_delay {} is invalid, not pausing", self.upload_delay_secs);
            Duration::ZERO
        })
    }

    fn sanitized(mut self) -> Self {
        if !self.upload_delay_secs.is_finite() || self.upload_delay_secs < 0.0 {
            tracing::warn!(
                "upload_delay {} is invalid, using 0",
                self.upload_delay_secs
            );
            self.upload_delay_secs = 0.0;
        } else if self.upload_delay_secs > MAX_UPLOAD_DELAY_SECS {
            tracing::warn!(
                "upload_delay {} is too long, using {MAX_UPLOAD_DELAY_SECS}",
                self.upload_delay_secs
            );
            self.upload_delay_secs = MAX_UPLOAD_DELAY_SECS;
        }
        self
    }
}
