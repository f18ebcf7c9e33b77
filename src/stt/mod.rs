//! STT (Speech-to-Text) module.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  transcribe_wav(model, path, chunk_frames)                │
//! │      │                                                    │
//! │      ├─ read WAV header → AudioFormat → reject unsupported│
//! │      ├─ SpeechModel::recognizer(rate) → SpeechEngine      │
//! │      └─ Transcription: feed chunks → finish → transcript  │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! The production [`SpeechModel`] is `VoskModel` (feature `vosk`).  Without
//! it, [`UnavailableModel`] keeps the bot running and every recognition
//! fails with a descriptive error.

pub mod engine;
pub mod recognizer;
#[cfg(feature = "vosk")]
pub mod vosk;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{Decoding, SpeechEngine, SpeechModel, SttError, UnavailableModel, Utterance};
pub use recognizer::{
    transcribe_wav, AudioFormat, RecognitionState, RecognizeError, Transcription,
    DEFAULT_CHUNK_FRAMES, SUPPORTED_SAMPLE_RATES,
};
#[cfg(feature = "vosk")]
pub use self::vosk::VoskModel;

#[cfg(test)]
pub use engine::{ScriptedEngine, ScriptedModel};
