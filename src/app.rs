//! Application context shared by every handler.
//!
//! Built once in `main` and handed to the dispatcher as a dependency, so
//! handlers receive the gateway, the loaded model and the configuration
//! explicitly instead of reaching for globals.

use std::sync::Arc;

use crate::bot::ChatGateway;
use crate::config::AppConfig;
use crate::pipeline::VoicePipeline;
use crate::stt::SpeechModel;

pub struct AppContext {
    pub config: AppConfig,
    pub pipeline: VoicePipeline,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        gateway: Arc<dyn ChatGateway>,
        model: Arc<dyn SpeechModel>,
    ) -> Self {
        let pipeline = VoicePipeline::new(&config, gateway, model);
        Self { config, pipeline }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::RecordingGateway;
    use crate::stt::UnavailableModel;

    #[tokio::test]
    async fn context_replies_use_configured_text() {
        let mut config = AppConfig::default();
        config.replies.welcome = "hello".into();
        let gateway = Arc::new(RecordingGateway::new());

        let app = AppContext::new(
            config,
            gateway.clone(),
            Arc::new(UnavailableModel::new("test")),
        );
        app.pipeline.greet(3, 4).await;

        assert_eq!(gateway.sent()[0].text, "hello");
        assert!(app.config.telegram.skip_pending_updates);
    }
}
