//! Configuration module for the voice transcription bot.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each pipeline
//! stage, `AppPaths` for cross-platform data directories, and TOML
//! persistence via `AppConfig::load` / `AppConfig::save_to`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, FetchConfig, ReplyConfig, StorageConfig, SttConfig, TelegramConfig,
    TranscodeConfig, TOKEN_ENV_VAR,
};
