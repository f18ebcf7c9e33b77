//! Telegram integration.
//!
//! * [`ChatGateway`] / [`TelegramGateway`] — outbound API calls.
//! * [`Command`] — `/start` and `/help`.
//! * [`dispatch::run`] — the long-polling dispatcher wired to the pipeline.

pub mod commands;
pub mod dispatch;
pub mod gateway;

pub use commands::Command;
pub use gateway::{ChatGateway, GatewayError, TelegramGateway};

#[cfg(test)]
pub use gateway::{RecordingGateway, SentText};
