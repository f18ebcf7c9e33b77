//! Inbound side: the teloxide dispatcher tree and its endpoints.
//!
//! ```text
//! Update::Message
//!   ├─ /start, /help  → VoicePipeline::greet
//!   └─ voice message  → VoicePipeline::handle_voice
//! ```
//!
//! The [`AppContext`] is injected into every endpoint through dptree's
//! dependency map; there is no global bot or dispatcher.

use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use super::commands::Command;
use crate::app::AppContext;
use crate::pipeline::VoiceMessage;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
pub type HandlerResult = Result<(), HandlerError>;

/// Extract the voice attachment from a message, if it carries one.
pub fn voice_message(msg: &Message) -> Option<VoiceMessage> {
    let voice = msg.voice()?;
    Some(VoiceMessage {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        // Channel posts have no sender; the per-message request id keeps
        // their transient files apart anyway.
        sender_id: msg.from.as_ref().map_or(0, |user| user.id.0),
        file_id: voice.file.id.clone(),
    })
}

/// Handler tree for [`Dispatcher`].
pub fn schema() -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(on_command),
        )
        .branch(dptree::filter_map(|msg: Message| voice_message(&msg)).endpoint(on_voice))
}

async fn on_command(app: Arc<AppContext>, msg: Message, cmd: Command) -> HandlerResult {
    log::info!("bot: {cmd:?} in chat {}", msg.chat.id);
    app.pipeline.greet(msg.chat.id.0, msg.id.0).await;
    Ok(())
}

async fn on_voice(app: Arc<AppContext>, voice: VoiceMessage) -> HandlerResult {
    // Outcome is already logged and answered inside the pipeline.
    let _ = app.pipeline.handle_voice(voice).await;
    Ok(())
}

/// Prepare the bot and run the dispatcher until Ctrl-C.
pub async fn run(bot: Bot, app: Arc<AppContext>) {
    if app.config.telegram.skip_pending_updates {
        match bot.delete_webhook().drop_pending_updates(true).await {
            Ok(_) => log::info!("bot: pending updates dropped"),
            Err(e) => log::warn!("bot: could not drop pending updates: {e}"),
        }
    }

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        log::warn!("bot: could not register commands: {e}");
    }

    log::info!("bot: polling for updates");
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![app])
        .default_handler(|update: Arc<Update>| async move {
            log::debug!("bot: ignoring update {:?}", update.id);
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    log::info!("bot: dispatcher stopped");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
