//! Application entry point — voice transcription bot.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from the path given as the first argument, or from
//!    the platform settings file (written with defaults when missing);
//!    apply `TELOXIDE_TOKEN`; validate.
//! 3. Load the speech model (degrades to an unavailable model on failure).
//! 4. Build the `teloxide::Bot` and the [`AppContext`].
//! 5. Run the dispatcher until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::Bot;
use voice_transcribe_bot::{
    app::AppContext,
    bot::{dispatch, TelegramGateway},
    config::{AppConfig, AppPaths},
    stt::SpeechModel,
};

// ---------------------------------------------------------------------------
// Speech model
// ---------------------------------------------------------------------------

#[cfg(feature = "vosk")]
fn load_model(path: &std::path::Path) -> Arc<dyn SpeechModel> {
    use voice_transcribe_bot::stt::{UnavailableModel, VoskModel};

    match VoskModel::load(path) {
        Ok(model) => {
            log::info!("Vosk model loaded: {}", path.display());
            Arc::new(model)
        }
        Err(e) => {
            log::warn!(
                "Could not load Vosk model ({}): {e}. Recognition will fail.",
                path.display()
            );
            Arc::new(UnavailableModel::new(e.to_string()))
        }
    }
}

#[cfg(not(feature = "vosk"))]
fn load_model(path: &std::path::Path) -> Arc<dyn SpeechModel> {
    use voice_transcribe_bot::stt::UnavailableModel;

    log::warn!(
        "Built without the `vosk` feature; model {} not loaded. Recognition will fail.",
        path.display()
    );
    Arc::new(UnavailableModel::new("built without the `vosk` feature"))
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("voice transcription bot starting up");

    // 2. Configuration
    let paths = AppPaths::new();
    let settings_file = match std::env::args_os().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            match AppConfig::write_starter(&paths.settings_file) {
                Ok(true) => log::info!(
                    "Wrote starter configuration to {}",
                    paths.settings_file.display()
                ),
                Ok(false) => {}
                Err(e) => log::warn!(
                    "Could not write starter configuration to {}: {e}",
                    paths.settings_file.display()
                ),
            }
            paths.settings_file.clone()
        }
    };

    let mut config = AppConfig::load_from(&settings_file)
        .with_context(|| format!("failed to load {}", settings_file.display()))?;
    config.apply_env();
    config.validate()?;
    log::info!("Configuration: {}", settings_file.display());

    // 3. Speech model
    let model_path = config.stt.resolve_model_path(&paths.models_dir);
    let model = load_model(&model_path);

    // 4. Bot + context
    let mut bot = Bot::new(config.telegram.token.clone());
    if let Some(api_url) = &config.telegram.api_url {
        let url = api_url
            .parse()
            .with_context(|| format!("invalid telegram.api_url {api_url:?}"))?;
        bot = bot.set_api_url(url);
    }

    let gateway = Arc::new(TelegramGateway::new(bot.clone()));
    let app = Arc::new(AppContext::new(config, gateway, model));

    // 5. Dispatch
    dispatch::run(bot, app).await;
    Ok(())
}
