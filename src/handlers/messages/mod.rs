//! Message handlers module
//!
//! Handles incoming text messages: option replies and structured actions

use chrono::Utc;
use teloxide::{prelude::*, types::Message, Bot};
use tracing::debug;

use crate::handlers::actions::handle_text;
use crate::state::AppContext;
use crate::utils::errors::{Result, SecretaryBotError};

/// Handle incoming text messages
pub async fn handle_message(bot: Bot, msg: Message, app: AppContext) -> Result<()> {
    let user = msg
        .from
        .as_ref()
        .ok_or_else(|| SecretaryBotError::InvalidInput("No user in message".to_string()))?;

    let user_id = user.id.0 as i64;
    let chat_id = msg.chat.id;

    let Some(text) = msg.text() else {
        debug!(user_id, chat_id = ?chat_id, "Ignoring non-text message");
        return Ok(());
    };
    if !chat_id.is_user() {
        return Ok(());
    }

    debug!(user_id, chat_id = ?chat_id, "Processing message");
    let reply = handle_text(&app, user_id, text, Utc::now()).await;
    bot.send_message(chat_id, reply).await?;
    Ok(())
}
