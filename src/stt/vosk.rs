//! Vosk (Kaldi) backend, compiled with the `vosk` feature.
//!
//! The `vosk` crate already decodes the engine's JSON payloads into typed
//! results; this module only maps them onto [`Utterance`] / [`Decoding`].

use std::path::Path;

use ::vosk::{CompleteResult, DecodingState, Model, Recognizer};

use super::engine::{Decoding, SpeechEngine, SpeechModel, SttError, Utterance};

/// A Vosk model directory loaded into memory.
pub struct VoskModel {
    model: Model,
}

impl std::fmt::Debug for VoskModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoskModel").finish_non_exhaustive()
    }
}

impl VoskModel {
    /// Load the model stored under `model_dir`.
    ///
    /// # Errors
    ///
    /// - [`SttError::ModelNotFound`] — `model_dir` does not exist.
    /// - [`SttError::ModelLoad`]     — libvosk rejected the directory.
    pub fn load(model_dir: impl AsRef<Path>) -> Result<Self, SttError> {
        let path = model_dir.as_ref();
        if !path.exists() {
            return Err(SttError::ModelNotFound(path.display().to_string()));
        }

        let path_str = path.to_str().ok_or_else(|| {
            SttError::ModelNotFound(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        ::vosk::set_log_level(::vosk::LogLevel::Warn);
        let model = Model::new(path_str)
            .ok_or_else(|| SttError::ModelLoad(path.display().to_string()))?;
        Ok(Self { model })
    }
}

impl SpeechModel for VoskModel {
    fn recognizer(&self, sample_rate: u32) -> Result<Box<dyn SpeechEngine>, SttError> {
        let recognizer = Recognizer::new(&self.model, sample_rate as f32)
            .ok_or(SttError::RecognizerInit { sample_rate })?;
        Ok(Box::new(VoskSession { recognizer }))
    }
}

struct VoskSession {
    recognizer: Recognizer,
}

/// Text of the best hypothesis, whichever shape the engine produced.
fn best_text(result: CompleteResult<'_>) -> String {
    match result {
        CompleteResult::Single(single) => single.text.to_string(),
        CompleteResult::Multiple(multiple) => multiple
            .alternatives
            .first()
            .map(|alt| alt.text.to_string())
            .unwrap_or_default(),
    }
}

impl SpeechEngine for VoskSession {
    fn accept(&mut self, samples: &[i16]) -> Result<Decoding, SttError> {
        let state = self
            .recognizer
            .accept_waveform(samples)
            .map_err(|e| SttError::Decoding(format!("{e:?}")))?;

        match state {
            DecodingState::Finalized => {
                Ok(Decoding::Accepted(Utterance::new(best_text(self.recognizer.result()))))
            }
            DecodingState::Running => Ok(Decoding::Partial(
                self.recognizer.partial_result().partial.to_string(),
            )),
            DecodingState::Failed => Err(SttError::Decoding(
                "engine reported a failed decoding state".into(),
            )),
        }
    }

    fn finish(&mut self) -> Result<Utterance, SttError> {
        Ok(Utterance::new(best_text(self.recognizer.final_result())))
    }
}
