//! SecretaryBot Telegram Bot
//!
//! Main application entry point

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::{error, info, warn};

use SecretaryBot::{
    config::{Settings, StorageBackend},
    database::{create_pool, run_migrations, DatabaseService, InMemoryStore},
    handlers::{handle_command, handle_message, Command},
    scheduling::SchedulingEngine,
    services::{MaintenanceRunner, Messenger, TelegramMessenger},
    state::{AppContext, SessionStore, StateStorage},
    utils::logging,
};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("loading configuration")?;
    settings.validate().context("validating configuration")?;

    // Initialize logging
    let _log_guard = logging::init_logging(&settings.logging).context("initializing logging")?;

    info!("Starting {}...", SecretaryBot::info());

    let database = match settings.storage.backend {
        StorageBackend::Postgres => {
            info!("Connecting to database...");
            let pool = create_pool(&settings.database)
                .await
                .context("connecting to postgres")?;
            info!("Running database migrations...");
            run_migrations(&pool).await.context("running migrations")?;
            DatabaseService::new(pool)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; bookings are lost on restart");
            DatabaseService::in_memory(InMemoryStore::new())
        }
    };

    // Initialize session state
    info!("Connecting to Redis...");
    let state_storage = StateStorage::new(settings.redis.clone())
        .await
        .context("connecting to redis")?;
    state_storage.test_connection().await.context("pinging redis")?;
    let sessions: Arc<dyn SessionStore> = Arc::new(state_storage);

    // Initialize bot
    let bot = Bot::new(&settings.bot.token);
    let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(bot.clone()));

    let engine = SchedulingEngine::new(database.clone(), &settings, messenger)
        .context("building scheduling engine")?;
    let app = AppContext::new(settings.clone(), database.clone(), engine.clone(), sessions);

    let interval = Duration::from_secs(settings.recurrence.run_interval_hours.max(1) * 3600);
    let maintenance = MaintenanceRunner::new(database, engine, settings.recurrence.clone()).spawn(interval);

    let mut dispatcher = Dispatcher::builder(bot, create_handler())
        .dependencies(dptree::deps![app])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd);
        })
        .enable_ctrlc_handler()
        .build();

    info!("Starting bot with polling mode...");
    dispatcher.dispatch().await;

    maintenance.abort();
    info!("SecretaryBot has been shut down.");

    Ok(())
}

/// Create the main update handler
fn create_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_commands),
        )
        .branch(dptree::endpoint(handle_messages))
}

/// Handle bot commands
async fn handle_commands(bot: Bot, msg: Message, cmd: Command, app: AppContext) -> HandlerResult {
    if let Err(e) = handle_command(bot, msg, cmd, app).await {
        error!(error = %e, "Error handling command");
        return Err(e.into());
    }
    Ok(())
}

/// Handle regular messages
async fn handle_messages(bot: Bot, msg: Message, app: AppContext) -> HandlerResult {
    if let Err(e) = handle_message(bot, msg, app).await {
        error!(error = %e, "Error handling message");
        return Err(e.into());
    }
    Ok(())
}
