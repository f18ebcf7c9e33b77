//! Chunked recognition over a converted WAV file.
//!
//! [`transcribe_wav`] validates the file's format, opens a session on the
//! model at the file's sample rate and streams the samples through a
//! [`Transcription`] in fixed-size chunks.
//!
//! # Session states
//!
//! ```text
//! AwaitingChunk ──feed──▶ Accepted ──┐
//!       ▲        └─feed─▶ Partial  ──┤
//!       └────────────────────────────┘
//! AwaitingChunk / Accepted / Partial ──end_of_stream──▶ EndOfStream
//! EndOfStream ──finish──▶ Finalized
//! ```
//!
//! Only accepted utterances and the final flush contribute to the
//! transcript; partial hypotheses are logged and dropped.

use std::fmt;
use std::path::Path;

use thiserror::Error;

use super::engine::{Decoding, SpeechEngine, SpeechModel, SttError};

/// Sample rates the recognizer accepts, in Hz.
pub const SUPPORTED_SAMPLE_RATES: [u32; 3] = [8_000, 16_000, 48_000];

/// Frames handed to the engine per call unless configured otherwise.
pub const DEFAULT_CHUNK_FRAMES: usize = 4_000;

// ---------------------------------------------------------------------------
// AudioFormat
// ---------------------------------------------------------------------------

/// The parameters of a WAV file that matter to the recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub channels: u16,
    pub bits_per_sample: u16,
    pub sample_rate: u32,
    /// `false` for IEEE float samples.
    pub integer: bool,
}

impl AudioFormat {
    /// Mono, 16-bit integer PCM at one of [`SUPPORTED_SAMPLE_RATES`].
    pub fn is_supported(&self) -> bool {
        self.channels == 1
            && self.bits_per_sample == 16
            && self.integer
            && SUPPORTED_SAMPLE_RATES.contains(&self.sample_rate)
    }
}

impl From<hound::WavSpec> for AudioFormat {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
            sample_rate: spec.sample_rate,
            integer: spec.sample_format == hound::SampleFormat::Int,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} channel(s), {} bytes/sample{}, {} Hz",
            self.channels,
            self.bits_per_sample / 8,
            if self.integer { "" } else { " (float)" },
            self.sample_rate
        )
    }
}

// ---------------------------------------------------------------------------
// RecognizeError
// ---------------------------------------------------------------------------

/// Errors from [`transcribe_wav`].
#[derive(Debug, Error)]
pub enum RecognizeError {
    /// The file is readable but not in a format the engine accepts.
    #[error("unsupported audio format: {0}")]
    InvalidFormat(AudioFormat),

    /// The file is missing, truncated or not a WAV file.
    #[error("failed to read audio: {0}")]
    Audio(#[from] hound::Error),

    #[error(transparent)]
    Engine(#[from] SttError),
}

// ---------------------------------------------------------------------------
// Transcription
// ---------------------------------------------------------------------------

/// Where a [`Transcription`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionState {
    AwaitingChunk,
    /// The last chunk completed an utterance.
    Accepted,
    /// The last chunk left the utterance open.
    Partial,
    EndOfStream,
    Finalized,
}

/// Accumulates a transcript from one engine session.
pub struct Transcription {
    engine: Box<dyn SpeechEngine>,
    state: RecognitionState,
    segments: Vec<String>,
}

impl Transcription {
    pub fn new(engine: Box<dyn SpeechEngine>) -> Self {
        Self {
            engine,
            state: RecognitionState::AwaitingChunk,
            segments: Vec::new(),
        }
    }

    pub fn state(&self) -> RecognitionState {
        self.state
    }

    /// Feed one chunk of samples to the engine.
    pub fn feed(&mut self, samples: &[i16]) -> Result<RecognitionState, SttError> {
        if matches!(
            self.state,
            RecognitionState::EndOfStream | RecognitionState::Finalized
        ) {
            return Err(SttError::Decoding(
                "chunk received after end of stream".into(),
            ));
        }

        self.state = match self.engine.accept(samples)? {
            Decoding::Accepted(utterance) => {
                log::info!("stt: utterance: {:?}", utterance.text);
                self.push_segment(&utterance.text);
                RecognitionState::Accepted
            }
            Decoding::Partial(hypothesis) => {
                log::debug!("stt: partial: {hypothesis:?}");
                RecognitionState::Partial
            }
        };
        Ok(self.state)
    }

    /// Mark that no more chunks will arrive.
    pub fn end_of_stream(&mut self) {
        if self.state != RecognitionState::Finalized {
            self.state = RecognitionState::EndOfStream;
        }
    }

    /// Flush the engine and return the full transcript (possibly empty).
    pub fn finish(&mut self) -> Result<String, SttError> {
        if self.state != RecognitionState::Finalized {
            let last = self.engine.finish()?;
            log::info!("stt: final result: {:?}", last.text);
            self.push_segment(&last.text);
            self.state = RecognitionState::Finalized;
        }
        Ok(self.transcript())
    }

    /// Text accumulated so far, segments separated by single spaces.
    pub fn transcript(&self) -> String {
        self.segments.join(" ")
    }

    fn push_segment(&mut self, text: &str) {
        let text = text.trim();
        if !text.is_empty() {
            self.segments.push(text.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// transcribe_wav
// ---------------------------------------------------------------------------

/// Recognize the speech in the WAV file at `path`.
///
/// Blocking: call it from `tokio::task::spawn_blocking`.
///
/// # Errors
///
/// - [`RecognizeError::InvalidFormat`] before any engine session is opened.
/// - [`RecognizeError::Audio`] when the file cannot be read.
/// - [`RecognizeError::Engine`] when the engine fails.
pub fn transcribe_wav(
    model: &dyn SpeechModel,
    path: &Path,
    chunk_frames: usize,
) -> Result<String, RecognizeError> {
    let mut reader = hound::WavReader::open(path)?;
    let format = AudioFormat::from(reader.spec());
    log::info!("stt: {}: {format}", path.display());

    if !format.is_supported() {
        return Err(RecognizeError::InvalidFormat(format));
    }

    let mut session = Transcription::new(model.recognizer(format.sample_rate)?);

    // Mono, so one frame is one sample.
    let chunk_len = chunk_frames.max(1);
    let mut chunk = Vec::with_capacity(chunk_len);
    for sample in reader.samples::<i16>() {
        chunk.push(sample?);
        if chunk.len() == chunk_len {
            session.feed(&chunk)?;
            chunk.clear();
        }
    }
    if !chunk.is_empty() {
        session.feed(&chunk)?;
    }

    session.end_of_stream();
    Ok(session.finish()?)
}

/// Write `samples` as a mono 16-bit WAV file (test fixture helper).
#[cfg(test)]
pub(crate) fn write_pcm_wav(path: &Path, sample_rate: u32, samples: &[i16]) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
