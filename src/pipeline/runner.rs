//! Voice pipeline: drives fetch → transcode → recognize → reply for one
//! voice message.
//!
//! # Pipeline flow
//!
//! ```text
//! VoiceMessage
//!   └─▶ gateway.file_url            ── Err ─▶ Fetch
//!         └─▶ fetcher.fetch (.ogg)  ── Err ─▶ Fetch
//!               └─▶ transcoder.convert (.wav)   ── Err ─▶ Convert
//!                     └─▶ .wav exists?          ── no  ─▶ MissingOutput
//!                           └─▶ spawn_blocking(transcribe_wav)
//!                                 ├─ InvalidFormat ─▶ InvalidFormat
//!                                 ├─ other error   ─▶ Recognition
//!                                 └─ Ok(text)
//! cleanup(.ogg, .wav)   ← always, exactly once
//! reply: transcript | unintelligible | error text
//! ```
//!
//! Every failure is answered and logged here; nothing propagates to the
//! dispatcher.

use std::path::PathBuf;
use std::sync::Arc;

use uuid::Uuid;

use crate::audio::{FileFetcher, Transcoder, TransientFiles};
use crate::bot::ChatGateway;
use crate::config::{AppConfig, ReplyConfig};
use crate::stt::{transcribe_wav, SpeechModel};

use super::error::PipelineError;

/// An inbound voice message, stripped down to what the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceMessage {
    pub chat_id: i64,
    pub message_id: i32,
    /// Telegram user id of the sender (0 when there is none).
    pub sender_id: u64,
    /// Platform identifier of the voice attachment.
    pub file_id: String,
}

/// Sequences the pipeline stages for each voice message.
///
/// Cheap to share: all fields are either `Arc`s or small clones.
pub struct VoicePipeline {
    gateway: Arc<dyn ChatGateway>,
    model: Arc<dyn SpeechModel>,
    fetcher: FileFetcher,
    transcoder: Transcoder,
    replies: ReplyConfig,
    work_dir: PathBuf,
    chunk_frames: usize,
}

impl VoicePipeline {
    /// Build the pipeline from configuration.
    ///
    /// * `gateway` — chat platform (e.g. `TelegramGateway`).
    /// * `model`   — loaded speech model (e.g. `VoskModel`).
    pub fn new(
        config: &AppConfig,
        gateway: Arc<dyn ChatGateway>,
        model: Arc<dyn SpeechModel>,
    ) -> Self {
        Self {
            gateway,
            model,
            fetcher: FileFetcher::from_config(&config.fetch),
            transcoder: Transcoder::from_config(&config.transcode),
            replies: config.replies.clone(),
            work_dir: config.storage.work_dir.clone(),
            chunk_frames: config.stt.chunk_frames,
        }
    }

    /// Replace the HTTP fetcher (e.g. one with a custom client).
    pub fn with_fetcher(mut self, fetcher: FileFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    /// Answer `/start` or `/help`.
    pub async fn greet(&self, chat_id: i64, message_id: i32) {
        self.send(chat_id, &self.replies.welcome, Some(message_id))
            .await;
    }

    /// Transcribe one voice message and answer it.
    ///
    /// Returns the transcript (empty when nothing was recognised) or the
    /// failure that was reported to the user.
    pub async fn handle_voice(&self, voice: VoiceMessage) -> Result<String, PipelineError> {
        let request_id = Uuid::new_v4().simple().to_string();
        log::info!(
            "pipeline[{request_id}]: voice message {} from user {} in chat {}",
            voice.message_id,
            voice.sender_id,
            voice.chat_id
        );

        let files = TransientFiles::new(&self.work_dir, voice.sender_id, &request_id);
        let result = self.process(&voice, &files).await;
        let removed = files.cleanup().await;
        log::debug!("pipeline[{request_id}]: removed {removed} transient file(s)");

        match &result {
            Ok(text) if text.is_empty() => {
                log::info!("pipeline[{request_id}]: nothing recognised");
                self.send(voice.chat_id, &self.replies.unintelligible, None)
                    .await;
            }
            Ok(text) => {
                log::info!("pipeline[{request_id}]: transcript of {} chars", text.chars().count());
                let reply = self.replies.transcript(text);
                self.send(voice.chat_id, &reply, Some(voice.message_id))
                    .await;
            }
            Err(e) => {
                log::error!("pipeline[{request_id}]: {e}");
                let reply_to = e.quotes_message().then_some(voice.message_id);
                self.send(voice.chat_id, e.reply(&self.replies), reply_to)
                    .await;
            }
        }

        result
    }

    // -----------------------------------------------------------------------
    // Stages
    // -----------------------------------------------------------------------

    async fn process(
        &self,
        voice: &VoiceMessage,
        files: &TransientFiles,
    ) -> Result<String, PipelineError> {
        // ── 1. Download ──────────────────────────────────────────────────
        let url = self.gateway.file_url(&voice.file_id).await?;
        self.fetcher.fetch(&url, files.source()).await?;

        // ── 2. Convert ───────────────────────────────────────────────────
        self.transcoder
            .convert(files.source(), files.converted())
            .await?;

        if !tokio::fs::try_exists(files.converted())
            .await
            .unwrap_or(false)
        {
            return Err(PipelineError::MissingOutput(files.converted().to_path_buf()));
        }

        // ── 3. Recognize (blocking → thread pool) ────────────────────────
        let model = Arc::clone(&self.model);
        let wav = files.converted().to_path_buf();
        let chunk_frames = self.chunk_frames;

        let text = tokio::task::spawn_blocking(move || {
            transcribe_wav(model.as_ref(), &wav, chunk_frames)
        })
        .await
        .map_err(|e| PipelineError::Recognition(format!("recognition task failed: {e}")))??;

        Ok(text)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn send(&self, chat_id: i64, text: &str, reply_to: Option<i32>) {
        if let Err(e) = self.gateway.send_text(chat_id, text, reply_to).await {
            log::warn!("pipeline: could not reply in chat {chat_id}: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::audio::fetch::{direct_fetcher, serve_once};
    use crate::audio::transcode::fake_converter;
    use crate::bot::{GatewayError, RecordingGateway};
    use crate::stt::recognizer::write_pcm_wav;
    use crate::stt::{ScriptedEngine, ScriptedModel, UnavailableModel};
    use tempfile::{tempdir, TempDir};

    const CHAT: i64 = -100;
    const MESSAGE: i32 = 77;
    const USER: u64 = 4242;

    /// Converter that "converts" by copying, so the served bytes are what
    /// the recognizer reads.
    const COPY: &str = "cp \"$3\" \"$4\"";

    struct Harness {
        tools: TempDir,
        work: TempDir,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                tools: tempdir().unwrap(),
                work: tempdir().unwrap(),
            }
        }

        fn pipeline(
            &self,
            converter: &str,
            gateway: Arc<RecordingGateway>,
            model: Arc<dyn SpeechModel>,
        ) -> VoicePipeline {
            let mut config = AppConfig::default();
            config.storage.work_dir = self.work.path().to_path_buf();
            config.transcode.program = fake_converter(self.tools.path(), converter)
                .to_string_lossy()
                .into_owned();
            VoicePipeline::new(&config, gateway, model).with_fetcher(direct_fetcher())
        }

        fn wav_bytes(&self, sample_rate: u32, samples: &[i16]) -> Vec<u8> {
            let path = self.tools.path().join("fixture.wav");
            write_pcm_wav(&path, sample_rate, samples);
            std::fs::read(path).unwrap()
        }

        fn work_dir_is_empty(&self) -> bool {
            std::fs::read_dir(self.work.path()).unwrap().count() == 0
        }
    }

    fn voice() -> VoiceMessage {
        VoiceMessage {
            chat_id: CHAT,
            message_id: MESSAGE,
            sender_id: USER,
            file_id: "AwACAgIAAxkBAAIB".into(),
        }
    }

    fn speech_model() -> Arc<ScriptedModel> {
        Arc::new(ScriptedModel::new(
            ScriptedEngine::new()
                .partial("привет")
                .utterance("привет")
                .final_text("как дела"),
        ))
    }

    // -----------------------------------------------------------------------
    // End-to-end scenarios
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn clear_speech_is_answered_with_labelled_transcript() {
        let h = Harness::new();
        let url = serve_once("200 OK", h.wav_bytes(16_000, &vec![500; 16_000])).await;
        let gateway = Arc::new(RecordingGateway::new().with_url(Ok(url)));
        let model = speech_model();
        let pipeline = h.pipeline(COPY, Arc::clone(&gateway), model.clone());

        let text = pipeline.handle_voice(voice()).await.unwrap();

        assert_eq!(text, "привет как дела");
        let sent = gateway.sent();
        assert_eq!(sent.len(), 1);
        let replies = ReplyConfig::default();
        assert!(sent[0].text.starts_with(&replies.transcript_label));
        assert!(sent[0].text.ends_with("привет как дела"));
        assert_eq!(sent[0].reply_to, Some(MESSAGE));
        assert_eq!(sent[0].chat_id, CHAT);
        assert_eq!(model.opened(), vec![16_000]);
        assert!(h.work_dir_is_empty());
    }

    #[tokio::test]
    async fn download_404_reports_fetch_error_without_transcript() {
        let h = Harness::new();
        let url = serve_once("404 Not Found", b"gone".to_vec()).await;
        let gateway = Arc::new(RecordingGateway::new().with_url(Ok(url)));
        let model = speech_model();
        let pipeline = h.pipeline(COPY, Arc::clone(&gateway), model.clone());

        let err = pipeline.handle_voice(voice()).await.unwrap_err();

        assert!(matches!(err, PipelineError::Fetch(_)));
        let sent = gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, ReplyConfig::default().fetch_error);
        assert!(model.opened().is_empty());
        assert!(h.work_dir_is_empty());
    }

    #[tokio::test]
    async fn silence_is_answered_as_unintelligible() {
        let h = Harness::new();
        let url = serve_once("200 OK", h.wav_bytes(48_000, &vec![0; 48_000])).await;
        let gateway = Arc::new(RecordingGateway::new().with_url(Ok(url)));
        let model = Arc::new(ScriptedModel::new(ScriptedEngine::new()));
        let pipeline = h.pipeline(COPY, Arc::clone(&gateway), model);

        let text = pipeline.handle_voice(voice()).await.unwrap();

        assert!(text.is_empty());
        let sent = gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, ReplyConfig::default().unintelligible);
        assert!(h.work_dir_is_empty());
    }

    #[tokio::test]
    async fn start_sends_only_the_welcome() {
        let h = Harness::new();
        let gateway = Arc::new(RecordingGateway::new());
        let pipeline = h.pipeline(COPY, Arc::clone(&gateway), speech_model());

        pipeline.greet(CHAT, 1).await;

        let sent = gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, ReplyConfig::default().welcome);
        assert_eq!(sent[0].reply_to, Some(1));
        assert!(h.work_dir_is_empty());
    }

    // -----------------------------------------------------------------------
    // Failure kinds
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn unresolvable_file_is_a_fetch_error() {
        let h = Harness::new();
        let gateway = Arc::new(
            RecordingGateway::new()
                .with_url(Err(GatewayError::Request("Bad Request: invalid file_id".into()))),
        );
        let pipeline = h.pipeline(COPY, Arc::clone(&gateway), speech_model());

        let err = pipeline.handle_voice(voice()).await.unwrap_err();

        assert!(matches!(err, PipelineError::Fetch(_)));
        assert_eq!(gateway.sent()[0].text, ReplyConfig::default().fetch_error);
    }

    #[tokio::test]
    async fn converter_failure_is_a_convert_error_and_cleans_up() {
        let h = Harness::new();
        let url = serve_once("200 OK", b"OggS broken".to_vec()).await;
        let gateway = Arc::new(RecordingGateway::new().with_url(Ok(url)));
        let pipeline = h.pipeline("echo 'Invalid data' >&2\nexit 1", Arc::clone(&gateway), speech_model());

        let err = pipeline.handle_voice(voice()).await.unwrap_err();

        assert!(matches!(err, PipelineError::Convert(_)));
        assert_eq!(gateway.sent()[0].text, ReplyConfig::default().convert_error);
        assert_eq!(gateway.sent()[0].reply_to, None);
        assert!(h.work_dir_is_empty());
    }

    #[tokio::test]
    async fn clean_exit_without_output_is_missing_output() {
        let h = Harness::new();
        let url = serve_once("200 OK", b"OggS".to_vec()).await;
        let gateway = Arc::new(RecordingGateway::new().with_url(Ok(url)));
        let pipeline = h.pipeline("exit 0", Arc::clone(&gateway), speech_model());

        let err = pipeline.handle_voice(voice()).await.unwrap_err();

        assert!(matches!(err, PipelineError::MissingOutput(_)));
        assert_eq!(gateway.sent()[0].text, ReplyConfig::default().missing_output);
        assert!(h.work_dir_is_empty());
    }

    #[tokio::test]
    async fn wrong_format_is_rejected_before_recognition() {
        let h = Harness::new();
        let stereo = {
            let path = h.tools.path().join("stereo.wav");
            let spec = hound::WavSpec {
                channels: 2,
                sample_rate: 16_000,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let mut writer = hound::WavWriter::create(&path, spec).unwrap();
            for _ in 0..3_200 {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
            std::fs::read(path).unwrap()
        };
        let url = serve_once("200 OK", stereo).await;
        let gateway = Arc::new(RecordingGateway::new().with_url(Ok(url)));
        let model = speech_model();
        let pipeline = h.pipeline(COPY, Arc::clone(&gateway), model.clone());

        let err = pipeline.handle_voice(voice()).await.unwrap_err();

        assert!(matches!(err, PipelineError::InvalidFormat(_)));
        assert_eq!(gateway.sent()[0].text, ReplyConfig::default().invalid_format);
        assert_eq!(gateway.sent()[0].reply_to, Some(MESSAGE));
        assert!(model.opened().is_empty());
        assert!(h.work_dir_is_empty());
    }

    #[tokio::test]
    async fn engine_failure_is_a_processing_error() {
        let h = Harness::new();
        let url = serve_once("200 OK", h.wav_bytes(8_000, &vec![1; 8_000])).await;
        let gateway = Arc::new(RecordingGateway::new().with_url(Ok(url)));
        let model = Arc::new(ScriptedModel::new(ScriptedEngine::new().failure("decoder")));
        let pipeline = h.pipeline(COPY, Arc::clone(&gateway), model);

        let err = pipeline.handle_voice(voice()).await.unwrap_err();

        assert!(matches!(err, PipelineError::Recognition(_)));
        assert_eq!(gateway.sent()[0].text, ReplyConfig::default().processing_error);
        assert!(h.work_dir_is_empty());
    }

    #[tokio::test]
    async fn missing_model_is_a_processing_error() {
        let h = Harness::new();
        let url = serve_once("200 OK", h.wav_bytes(16_000, &vec![1; 4_000])).await;
        let gateway = Arc::new(RecordingGateway::new().with_url(Ok(url)));
        let model = Arc::new(UnavailableModel::new("no model"));
        let pipeline = h.pipeline(COPY, Arc::clone(&gateway), model);

        let err = pipeline.handle_voice(voice()).await.unwrap_err();

        assert!(matches!(err, PipelineError::Recognition(_)));
        assert_eq!(gateway.sent()[0].text, ReplyConfig::default().processing_error);
    }

    // -----------------------------------------------------------------------
    // Transient files
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn same_user_back_to_back_finds_no_leftovers() {
        let h = Harness::new();
        let first = serve_once("200 OK", h.wav_bytes(16_000, &vec![3; 8_000])).await;
        let second = serve_once("200 OK", h.wav_bytes(16_000, &vec![3; 8_000])).await;
        let gateway = Arc::new(
            RecordingGateway::new()
                .with_url(Ok(first))
                .with_url(Ok(second)),
        );
        let pipeline = h.pipeline(COPY, Arc::clone(&gateway), speech_model());

        pipeline.handle_voice(voice()).await.unwrap();
        assert!(h.work_dir_is_empty());
        pipeline.handle_voice(voice()).await.unwrap();
        assert!(h.work_dir_is_empty());
        assert_eq!(gateway.sent().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_messages_from_one_user_do_not_collide() {
        let h = Harness::new();
        let first = serve_once("200 OK", h.wav_bytes(16_000, &vec![3; 8_000])).await;
        let second = serve_once("200 OK", h.wav_bytes(8_000, &vec![3; 8_000])).await;
        let gateway = Arc::new(
            RecordingGateway::new()
                .with_url(Ok(first))
                .with_url(Ok(second)),
        );
        let model = speech_model();
        let pipeline = h.pipeline(COPY, Arc::clone(&gateway), model.clone());

        let (a, b) = tokio::join!(pipeline.handle_voice(voice()), pipeline.handle_voice(voice()));

        assert!(a.is_ok() && b.is_ok());
        let mut rates = model.opened();
        rates.sort_unstable();
        assert_eq!(rates, vec![8_000, 16_000]);
        assert!(h.work_dir_is_empty());
    }

    #[tokio::test]
    async fn failed_reply_does_not_escape() {
        let h = Harness::new();
        let url = serve_once("200 OK", h.wav_bytes(16_000, &vec![500; 16_000])).await;
        let gateway = Arc::new(RecordingGateway::new().with_url(Ok(url)).failing_sends());
        let pipeline = h.pipeline(COPY, Arc::clone(&gateway), speech_model());

        let text = pipeline.handle_voice(voice()).await.unwrap();

        assert_eq!(text, "привет как дела");
        assert_eq!(gateway.sent().len(), 1);
        assert!(h.work_dir_is_empty());
    }
}
