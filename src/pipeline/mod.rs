//! Pipeline orchestrator for inbound voice messages.
//!
//! # Architecture
//!
//! ```text
//! teloxide dispatcher ──VoiceMessage──▶ VoicePipeline::handle_voice
//!                                          │
//!                                          ├─ ChatGateway::file_url
//!                                          ├─ FileFetcher::fetch      (.ogg)
//!                                          ├─ Transcoder::convert     (.wav)
//!                                          ├─ spawn_blocking(transcribe_wav)
//!                                          ├─ TransientFiles::cleanup
//!                                          └─ ChatGateway::send_text
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use teloxide::Bot;
//! use voice_transcribe_bot::bot::TelegramGateway;
//! use voice_transcribe_bot::config::AppConfig;
//! use voice_transcribe_bot::pipeline::{VoiceMessage, VoicePipeline};
//! use voice_transcribe_bot::stt::UnavailableModel;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let gateway = Arc::new(TelegramGateway::new(Bot::new("123:abc")));
//!     let model = Arc::new(UnavailableModel::new("demo"));
//!     let pipeline = VoicePipeline::new(&config, gateway, model);
//!
//!     let voice = VoiceMessage {
//!         chat_id: 1,
//!         message_id: 1,
//!         sender_id: 1,
//!         file_id: "AwACAgIAAxkBAAIB".into(),
//!     };
//!     let _ = pipeline.handle_voice(voice).await;
//! }
//! ```

pub mod error;
pub mod runner;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use error::PipelineError;
pub use runner::{VoiceMessage, VoicePipeline};
