//! # Survey Bot Main Entry Point
//!
//! Initializes logging, loads configuration, sets up the database,
//! starts the delivery loop, and runs the Telegram dispatcher.

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use survey_bot::bot::handlers::BotHandler;
use survey_bot::bot::AppState;
use survey_bot::config::Config;
use survey_bot::database::connection::DatabaseManager;
use survey_bot::database::repository::Repository;
use survey_bot::messenger::{Messenger, TelegramMessenger};
use survey_bot::services::collector::AnswerCollector;
use survey_bot::services::scheduler::DeliveryService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "survey_bot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!("Starting Survey Bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded - Database: {}, poll interval: {:?}",
        config.database_url, config.poll_interval
    );

    // Initialize database
    info!("Initializing database connection...");
    let db_manager = DatabaseManager::new(&config.database_url).await?;
    info!("Running database migrations...");
    db_manager.run_migrations().await?;
    let repo = Repository::new(db_manager.pool.clone(), config.admin_handles.clone());
    info!("Database initialized successfully");

    // Initialize bot and transport
    info!("Initializing Telegram bot...");
    let tg_bot = Bot::new(&config.telegram_bot_token);
    let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(tg_bot.clone()));

    // Answer collection and the delivery loop
    let collector = Arc::new(AnswerCollector::new(
        repo.clone(),
        Arc::clone(&messenger),
        config.reminder_interval,
    ));
    let delivery = DeliveryService::new(repo.clone(), Arc::clone(&collector), config.poll_interval);
    let delivery_task = tokio::spawn(delivery.run());
    info!("Delivery loop started");

    // Run the dispatcher
    let state = AppState::new(repo, messenger, collector);
    let handler = BotHandler::new(state);
    let bot_task = tokio::spawn(async move {
        Dispatcher::builder(tg_bot, handler.schema())
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    tokio::select! {
        result = bot_task => {
            if let Err(e) = result {
                tracing::error!("Bot task error: {}", e);
            }
        }
        result = delivery_task => {
            if let Err(e) = result {
                tracing::error!("Delivery task error: {}", e);
            }
        }
    }

    info!("Application stopped");
    Ok(())
}
