//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.
//! Every section is `#[serde(default)]`, so a settings file only needs the
//! keys it overrides.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::stt::{DEFAULT_CHUNK_FRAMES, SUPPORTED_SAMPLE_RATES};

/// Environment variable that overrides `telegram.token`.
///
/// Same name teloxide's `Bot::from_env` reads, so existing deployments keep
/// working.
pub const TOKEN_ENV_VAR: &str = "TELOXIDE_TOKEN";

// ---------------------------------------------------------------------------
// TelegramConfig
// ---------------------------------------------------------------------------

/// Connection settings for the Telegram Bot API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather.  Empty means "not configured".
    pub token: String,
    /// Custom Bot API server (e.g. a self-hosted `telegram-bot-api`).
    /// `None` uses `https://api.telegram.org`.
    pub api_url: Option<String>,
    /// Drop updates queued while the bot was offline.
    pub skip_pending_updates: bool,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: None,
            skip_pending_updates: true,
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the offline speech recognizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// Directory of a pre-trained Vosk model.
    pub model_path: PathBuf,
    /// Number of PCM frames handed to the engine per call.
    pub chunk_frames: usize,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("vosk-model-small-ru-0.22"),
            chunk_frames: DEFAULT_CHUNK_FRAMES,
        }
    }
}

impl SttConfig {
    /// Resolve `model_path` against the working directory first, then
    /// against `models_dir`.  Returns `model_path` unchanged when neither
    /// location exists so the caller can report the configured value.
    pub fn resolve_model_path(&self, models_dir: &Path) -> PathBuf {
        if self.model_path.is_absolute() || self.model_path.exists() {
            return self.model_path.clone();
        }
        let candidate = models_dir.join(&self.model_path);
        if candidate.exists() {
            candidate
        } else {
            self.model_path.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// TranscodeConfig
// ---------------------------------------------------------------------------

/// Settings for the external audio converter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    /// Converter executable, looked up on `PATH` when not absolute.
    pub program: String,
    /// Force mono 16-bit output at this rate.  `None` lets the converter keep
    /// the source parameters (Telegram voice notes decode to 48 kHz mono).
    pub sample_rate: Option<u32>,
    /// Upper bound for a single conversion, in seconds.
    pub timeout_secs: u64,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".into(),
            sample_rate: None,
            timeout_secs: 120,
        }
    }
}

// ---------------------------------------------------------------------------
// FetchConfig
// ---------------------------------------------------------------------------

/// Settings for downloading voice files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Maximum seconds to wait for a download to complete.
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

/// Where transient audio files are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the per-message `.ogg` / `.wav` pair.
    pub work_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
        }
    }
}

// ---------------------------------------------------------------------------
// ReplyConfig
// ---------------------------------------------------------------------------

/// Every user-facing string the bot sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyConfig {
    /// Answer to `/start` and `/help`.
    pub welcome: String,
    /// Prefix placed before the transcript.
    pub transcript_label: String,
    /// Sent when recognition succeeded but produced no text.
    pub unintelligible: String,
    pub fetch_error: String,
    pub convert_error: String,
    pub missing_output: String,
    pub invalid_format: String,
    pub processing_error: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            welcome: "Привет! Отправь мне голосовое сообщение, и я расшифрую его.".into(),
            transcript_label: "Расшифровка:".into(),
            unintelligible: "Извините, я не смог разобрать это голосовое сообщение.".into(),
            fetch_error: "Ошибка загрузки аудио файла.".into(),
            convert_error: "Ошибка конвертации аудио файла.".into(),
            missing_output: "Ошибка: файл .wav не был создан.".into(),
            invalid_format:
                "Неправильный формат аудио. Пожалуйста, отправьте голосовое сообщение заново."
                    .into(),
            processing_error: "Ошибка при обработке аудио файла.".into(),
        }
    }
}

impl ReplyConfig {
    /// `"<label> <transcript>"`.
    pub fn transcript(&self, text: &str) -> String {
        format!("{} {}", self.transcript_label, text)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use voice_transcribe_bot::config::AppConfig;
///
/// let mut config = AppConfig::load().unwrap();
/// config.apply_env();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub stt: SttConfig,
    pub transcode: TranscodeConfig,
    pub fetch: FetchConfig,
    pub storage: StorageConfig,
    pub replies: ReplyConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Write a default config to `path` unless a file is already there.
    ///
    /// Returns `true` when a starter file was created.
    pub fn write_starter(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        Ok(true)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_token_override(std::env::var(TOKEN_ENV_VAR).ok());
    }

    /// Replace the token with `token` when it is present and non-blank.
    pub fn apply_token_override(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.telegram.token = token.trim().to_string();
        }
    }

    /// Reject settings the bot cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.token.trim().is_empty() {
            bail!(
                "telegram.token is empty; set it in settings.toml or via {TOKEN_ENV_VAR}"
            );
        }
        if self.stt.chunk_frames == 0 {
            bail!("stt.chunk_frames must be greater than zero");
        }
        if self.fetch.timeout_secs == 0 {
            bail!("fetch.timeout_secs must be greater than zero");
        }
        if self.transcode.timeout_secs == 0 {
            bail!("transcode.timeout_secs must be greater than zero");
        }
        if let Some(rate) = self.transcode.sample_rate {
            if !SUPPORTED_SAMPLE_RATES.contains(&rate) {
                bail!(
                    "transcode.sample_rate {rate} is not accepted by the recognizer \
                     (supported: {SUPPORTED_SAMPLE_RATES:?})"
                );
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
