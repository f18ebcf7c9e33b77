//! Speech engine traits and the engine-level error type.
//!
//! # Overview
//!
//! [`SpeechModel`] is a loaded, shareable acoustic model.  It is object-safe
//! and `Send + Sync` so it can be held behind an `Arc<dyn SpeechModel>` in the
//! application context and used from any handler task.
//!
//! [`SpeechEngine`] is a single recognition session created by the model for
//! one audio stream.  It is `Send` (it moves into `spawn_blocking`) but not
//! shared.
//!
//! [`UnavailableModel`] is the stand-in used when no real model could be
//! loaded: every session request fails with a descriptive error.

use thiserror::Error;

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// Errors raised by a speech engine.
#[derive(Debug, Clone, Error)]
pub enum SttError {
    /// The model directory was not found at the given path.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// The engine library refused to load the model.
    #[error("Model failed to load: {0}")]
    ModelLoad(String),

    /// A recognizer could not be created for this sample rate.
    #[error("Recognizer initialisation failed at {sample_rate} Hz")]
    RecognizerInit { sample_rate: u32 },

    /// The engine reported a decoding failure for a chunk.
    #[error("Decoding failed: {0}")]
    Decoding(String),

    /// The binary was built without a speech backend.
    #[error("No speech backend available: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// A completed recognition result: either an utterance that ended at a
/// segment boundary, or the final flush at end of stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// What the engine made of one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoding {
    /// The chunk closed an utterance.
    Accepted(Utterance),
    /// Still inside an utterance; carries the current hypothesis.
    Partial(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// One streaming recognition session over 16-bit mono PCM.
pub trait SpeechEngine: Send {
    /// Feed the next chunk of samples.
    fn accept(&mut self, samples: &[i16]) -> Result<Decoding, SttError>;

    /// Flush whatever the engine still buffers at end of stream.
    fn finish(&mut self) -> Result<Utterance, SttError>;
}

/// A loaded model that can open recognition sessions.
pub trait SpeechModel: Send + Sync {
    /// Open a session for audio sampled at `sample_rate` Hz.
    fn recognizer(&self, sample_rate: u32) -> Result<Box<dyn SpeechEngine>, SttError>;
}

// Compile-time assertion: both traits must stay object-safe.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechEngine>, _: Box<dyn SpeechModel>) {}
};

// ---------------------------------------------------------------------------
// UnavailableModel
// ---------------------------------------------------------------------------

/// Fallback model used when the real one could not be loaded, so the bot
/// still starts and answers every voice message with a processing error.
#[derive(Debug, Clone)]
pub struct UnavailableModel {
    reason: String,
}

impl UnavailableModel {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl SpeechModel for UnavailableModel {
    fn recognizer(&self, _sample_rate: u32) -> Result<Box<dyn SpeechEngine>, SttError> {
        Err(SttError::Unavailable(self.reason.clone()))
    }
}

// ---------------------------------------------------------------------------
// Scripted engine  (test-only)
// ---------------------------------------------------------------------------

/// A test double that replays a fixed sequence of chunk decodings.
///
/// Once the script is exhausted every further chunk yields an empty partial.
/// [`ScriptedModel`] records the sample rate and chunk sizes of every session
/// it hands out.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct ScriptedEngine {
    steps: std::collections::VecDeque<Result<Decoding, SttError>>,
    final_text: String,
    chunks: std::sync::Arc<std::sync::Mutex<Vec<usize>>>,
}

#[cfg(test)]
impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn utterance(mut self, text: &str) -> Self {
        self.steps
            .push_back(Ok(Decoding::Accepted(Utterance::new(text))));
        self
    }

    pub fn partial(mut self, text: &str) -> Self {
        self.steps.push_back(Ok(Decoding::Partial(text.into())));
        self
    }

    pub fn failure(mut self, message: &str) -> Self {
        self.steps
            .push_back(Err(SttError::Decoding(message.into())));
        self
    }

    pub fn final_text(mut self, text: &str) -> Self {
        self.final_text = text.into();
        self
    }
}

#[cfg(test)]
impl SpeechEngine for ScriptedEngine {
    fn accept(&mut self, samples: &[i16]) -> Result<Decoding, SttError> {
        self.chunks.lock().unwrap().push(samples.len());
        self.steps
            .pop_front()
            .unwrap_or_else(|| Ok(Decoding::Partial(String::new())))
    }

    fn finish(&mut self) -> Result<Utterance, SttError> {
        Ok(Utterance::new(std::mem::take(&mut self.final_text)))
    }
}

/// Hands out clones of a template [`ScriptedEngine`].
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedModel {
    template: ScriptedEngine,
    opened: std::sync::Mutex<Vec<u32>>,
}

#[cfg(test)]
impl ScriptedModel {
    pub fn new(template: ScriptedEngine) -> Self {
        Self {
            template,
            opened: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Sample rates of every session opened so far.
    pub fn opened(&self) -> Vec<u32> {
        self.opened.lock().unwrap().clone()
    }

    /// Chunk lengths fed to sessions opened from this model.
    pub fn chunks(&self) -> Vec<usize> {
        self.template.chunks.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl SpeechModel for ScriptedModel {
    fn recognizer(&self, sample_rate: u32) -> Result<Box<dyn SpeechEngine>, SttError> {
        self.opened.lock().unwrap().push(sample_rate);
        Ok(Box::new(self.template.clone()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
