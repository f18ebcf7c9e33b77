//! Telegram bot that transcribes voice messages with an offline speech
//! recognizer.
//!
//! * [`config`]   — TOML settings and platform paths.
//! * [`bot`]      — Telegram gateway, commands and dispatcher.
//! * [`audio`]    — download, conversion and transient files.
//! * [`stt`]      — speech engine traits, chunked recognition, Vosk backend.
//! * [`pipeline`] — per-message orchestration and failure replies.
//! * [`app`]      — the context handed to every handler.

pub mod app;
pub mod audio;
pub mod bot;
pub mod config;
pub mod pipeline;
pub mod stt;
