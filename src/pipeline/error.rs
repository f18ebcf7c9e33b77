//! Failure kinds of a voice message and the reply each one gets.

use std::path::PathBuf;

use thiserror::Error;

use crate::audio::{FetchError, TranscodeError};
use crate::bot::GatewayError;
use crate::config::ReplyConfig;
use crate::stt::{AudioFormat, RecognizeError};

/// Why a voice message could not be transcribed.
///
/// Each variant maps to its own user-facing reply via [`reply`](Self::reply).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The attachment could not be resolved or downloaded.
    #[error("download failed: {0}")]
    Fetch(String),

    /// The converter failed.
    #[error("conversion failed: {0}")]
    Convert(String),

    /// The converter exited cleanly but left no output file.
    #[error("converter produced no file at {}", .0.display())]
    MissingOutput(PathBuf),

    /// The converted audio is not mono 16-bit PCM at a supported rate.
    #[error("unsupported audio format: {0}")]
    InvalidFormat(AudioFormat),

    /// Reading the audio or running the engine failed.
    #[error("recognition failed: {0}")]
    Recognition(String),
}

impl PipelineError {
    /// The text sent to the user for this failure.
    pub fn reply<'a>(&self, replies: &'a ReplyConfig) -> &'a str {
        match self {
            PipelineError::Fetch(_) => &replies.fetch_error,
            PipelineError::Convert(_) => &replies.convert_error,
            PipelineError::MissingOutput(_) => &replies.missing_output,
            PipelineError::InvalidFormat(_) => &replies.invalid_format,
            PipelineError::Recognition(_) => &replies.processing_error,
        }
    }

    /// Whether the reply quotes the voice message.  Only the format
    /// complaint does: it asks the user to resend that message.
    pub fn quotes_message(&self) -> bool {
        matches!(self, PipelineError::InvalidFormat(_))
    }
}

impl From<GatewayError> for PipelineError {
    fn from(e: GatewayError) -> Self {
        PipelineError::Fetch(e.to_string())
    }
}

impl From<FetchError> for PipelineError {
    fn from(e: FetchError) -> Self {
        PipelineError::Fetch(e.to_string())
    }
}

impl From<TranscodeError> for PipelineError {
    fn from(e: TranscodeError) -> Self {
        PipelineError::Convert(e.to_string())
    }
}

impl From<RecognizeError> for PipelineError {
    fn from(e: RecognizeError) -> Self {
        match e {
            RecognizeError::InvalidFormat(format) => PipelineError::InvalidFormat(format),
            other => PipelineError::Recognition(other.to_string()),
        }
    }
}
