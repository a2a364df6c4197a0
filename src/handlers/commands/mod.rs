//! Command handlers module
//!
//! This module contains handlers for the bot commands /start, /help and /agenda.

pub mod agenda;
pub mod help;
pub mod start;

use teloxide::{types::Message, utils::command::BotCommands, Bot};

use crate::state::AppContext;
use crate::utils::errors::Result;

/// All available bot commands
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Comandos da secretária:")]
pub enum Command {
    #[command(description = "Começar a usar a secretária")]
    Start(String),
    #[command(description = "Mostrar esta ajuda")]
    Help,
    #[command(description = "Ver a agenda do dia (opcional: AAAA-MM-DD)")]
    Agenda(String),
}

/// Main command dispatcher
pub async fn handle_command(bot: Bot, msg: Message, cmd: Command, app: AppContext) -> Result<()> {
    match cmd {
        Command::Start(payload) => start::handle_start(bot, msg, payload, app).await,
        Command::Help => help::handle_help(bot, msg).await,
        Command::Agenda(date) => agenda::handle_agenda(bot, msg, date, app).await,
    }
}
