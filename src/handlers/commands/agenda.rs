//! Agenda command handler
//!
//! `/agenda [YYYY-MM-DD]` lists the day's active bookings. Owners see the whole
//! business, clients only their own.

use chrono::Utc;
use teloxide::{prelude::*, types::Message, Bot};

use crate::handlers::actions::{dispatch, render_error, Action};
use crate::state::AppContext;
use crate::utils::errors::{Result, SecretaryBotError};

/// Handle /agenda command
pub async fn handle_agenda(bot: Bot, msg: Message, date: String, app: AppContext) -> Result<()> {
    let user = msg
        .from
        .as_ref()
        .ok_or_else(|| SecretaryBotError::InvalidInput("No user in message".to_string()))?;

    let text = agenda_reply(&app, user.id.0 as i64, &date).await;
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

pub async fn agenda_reply(app: &AppContext, user_id: i64, date: &str) -> String {
    let date = Some(date.trim()).filter(|d| !d.is_empty()).map(str::to_string);
    let result = match app.engine.context_for(user_id, Utc::now()).await {
        Ok(ctx) => dispatch(app, &ctx, Action::ListAgenda { date }).await,
        Err(e) => Err(e),
    };
    result.unwrap_or_else(|e| render_error(&e))
}
