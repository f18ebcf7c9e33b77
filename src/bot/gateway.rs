//! Outbound side of the chat platform.
//!
//! [`ChatGateway`] is the seam between the pipeline and Telegram: resolving
//! a voice attachment to a download URL and sending text back.  The
//! production implementation, [`TelegramGateway`], wraps a `teloxide::Bot`.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ReplyParameters};
use thiserror::Error;

/// Errors from the chat platform API.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The Bot API call failed (network, HTTP or API-level error).
    #[error("Telegram API request failed: {0}")]
    Request(String),
}

/// Async interface to the messaging platform.
///
/// Implementors must be `Send + Sync` so they can be shared across handler
/// tasks behind an `Arc<dyn ChatGateway>`.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Resolve an attachment identifier to a URL its bytes can be fetched
    /// from.
    async fn file_url(&self, file_id: &str) -> Result<String, GatewayError>;

    /// Send `text` to `chat_id`, as a reply to `reply_to` when given.
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<(), GatewayError>;
}

// ---------------------------------------------------------------------------
// TelegramGateway
// ---------------------------------------------------------------------------

/// [`ChatGateway`] backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
    /// `{api_url}/file/bot{token}`; file paths are appended to it.
    file_base: String,
}

impl std::fmt::Debug for TelegramGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramGateway").finish_non_exhaustive()
    }
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        let file_base = format!(
            "{}/file/bot{}",
            bot.api_url().as_str().trim_end_matches('/'),
            bot.token()
        );
        Self { bot, file_base }
    }

    /// Error text with the bot token masked; teloxide and reqwest errors may
    /// echo the request URL, which contains it.
    fn redact(&self, error: impl std::fmt::Display) -> GatewayError {
        GatewayError::Request(redact_token(&error.to_string(), self.bot.token()))
    }
}

fn redact_token(message: &str, token: &str) -> String {
    if token.is_empty() {
        message.to_string()
    } else {
        message.replace(token, "<redacted>")
    }
}

#[async_trait]
impl ChatGateway for TelegramGateway {
    async fn file_url(&self, file_id: &str) -> Result<String, GatewayError> {
        let file = self
            .bot
            .get_file(file_id.to_owned())
            .await
            .map_err(|e| self.redact(e))?;
        Ok(format!("{}/{}", self.file_base, file.path))
    }

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<(), GatewayError> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if let Some(id) = reply_to {
            request = request.reply_parameters(ReplyParameters::new(MessageId(id)));
        }
        request.await.map_err(|e| self.redact(e))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingGateway  (test-only)
// ---------------------------------------------------------------------------

/// A reply captured by [`RecordingGateway`].
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentText {
    pub chat_id: i64,
    pub text: String,
    pub reply_to: Option<i32>,
}

/// Test double that hands out queued download URLs and records every reply.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingGateway {
    urls: std::sync::Mutex<std::collections::VecDeque<Result<String, GatewayError>>>,
    sent: std::sync::Mutex<Vec<SentText>>,
    fail_sends: bool,
}

#[cfg(test)]
impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next `file_url` call.
    pub fn with_url(self, url: Result<String, GatewayError>) -> Self {
        self.urls.lock().unwrap().push_back(url);
        self
    }

    /// Make every `send_text` call fail (after recording it).
    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    pub fn sent(&self) -> Vec<SentText> {
        self.sent.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl ChatGateway for RecordingGateway {
    async fn file_url(&self, _file_id: &str) -> Result<String, GatewayError> {
        self.urls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Request("no url queued".into())))
    }

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<(), GatewayError> {
        self.sent.lock().unwrap().push(SentText {
            chat_id,
            text: text.to_string(),
            reply_to,
        });
        if self.fail_sends {
            return Err(GatewayError::Request("chat not found".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
