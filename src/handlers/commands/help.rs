//! Help command handler

use teloxide::{prelude::*, types::Message, utils::command::BotCommands, Bot};

use crate::handlers::commands::Command;
use crate::utils::errors::Result;

pub const HELP_FOOTER: &str = "Você também pode me pedir para agendar, cancelar, encaixar um cliente \
ou consultar horários livres. Para escolher uma opção oferecida, responda só com o número.";

/// Handle /help command
pub async fn handle_help(bot: Bot, msg: Message) -> Result<()> {
    let text = format!("{}\n\n{}", Command::descriptions(), HELP_FOOTER);
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
