//! Start command handler
//!
//! Handles /start. A bare /start makes the sender a business owner; a deep
//! link `/start <owner_id>` registers the sender as that owner's client.

use teloxide::{prelude::*, types::Message, Bot};
use tracing::{debug, info};

use crate::handlers::actions::render_error;
use crate::models::UserProfile;
use crate::state::AppContext;
use crate::utils::errors::{Result, SecretaryBotError};

/// Handle /start command
pub async fn handle_start(bot: Bot, msg: Message, payload: String, app: AppContext) -> Result<()> {
    let user = msg
        .from
        .as_ref()
        .ok_or_else(|| SecretaryBotError::InvalidInput("No user in message".to_string()))?;

    let user_id = user.id.0 as i64;
    debug!(user_id, chat_id = ?msg.chat.id, "Processing /start command");

    if !msg.chat.id.is_user() {
        bot.send_message(msg.chat.id, "Fale comigo em uma conversa privada para agendar.")
            .await?;
        return Ok(());
    }

    let text = start_reply(&app, user_id, Some(user.first_name.as_str()), &payload)
        .await
        .unwrap_or_else(|e| render_error(&e));
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// Create or attach the caller's profile and build the welcome text
pub async fn start_reply(app: &AppContext, user_id: i64, display_name: Option<&str>, payload: &str) -> Result<String> {
    let owner_id = payload.trim().parse::<i64>().ok().filter(|id| *id != user_id);

    let profile = match owner_id {
        Some(owner_id) => {
            let profile = app.database.register_client(user_id, owner_id, display_name).await?;
            info!(user_id, owner_id, "Client registered with business");
            profile
        }
        None => app.database.initialize_profile(user_id, display_name).await?,
    };

    Ok(welcome_text(&profile, display_name))
}

fn welcome_text(profile: &UserProfile, display_name: Option<&str>) -> String {
    let name = display_name.unwrap_or("tudo bem");
    if profile.is_owner() {
        format!(
            "Olá, {}! Sou sua secretária virtual. Vou cuidar da sua agenda.\n\
             Para seus clientes agendarem, compartilhe o link com /start {}.\n\
             Use /help para ver o que posso fazer.",
            name, profile.user_id
        )
    } else {
        format!(
            "Olá, {}! Agora você pode agendar horários comigo.\nUse /help para ver o que posso fazer.",
            name
        )
    }
}
