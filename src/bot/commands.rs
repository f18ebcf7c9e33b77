//! Bot commands.  Both answer with the welcome text.

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Поддерживаемые команды:")]
pub enum Command {
    #[command(description = "начать работу")]
    Start,
    #[command(description = "как пользоваться ботом")]
    Help,
}
