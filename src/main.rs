use std::sync::Arc;

use teloxide::prelude::*;
use tracing_subscriber::EnvFilter;

mod ai;
mod bot;
mod chat;
mod config;
mod error;
mod quiz;
mod web;

use ai::llm::{ChatModel, GeminiClient};
use ai::scrape::{HttpPageReader, PageReader};
use chat::cache::ReplyCache;
use chat::orchestrator::Orchestrator;
use chat::session::SessionStore;
use config::AppConfig;
use quiz::session::QuizStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("🤖 Starting Dev Bot...");

    // Load config
    let config = AppConfig::from_env()?;
    tracing::info!("Config loaded. Model: {}", config.gemini_model);

    // Prepare the reply cache file
    let cache = Arc::new(ReplyCache::new(config.cache_path.clone()));
    cache.ensure_file().await?;
    tracing::info!("Reply cache ready with {} entries.", cache.len().await);

    // Initialize AI modules
    let llm: Arc<dyn ChatModel> = Arc::new(GeminiClient::new(&config));
    let pages: Arc<dyn PageReader> = Arc::new(HttpPageReader::new());
    let tts = ai::tts::TtsManager::new(&config);
    let orchestrator = Orchestrator::new(llm.clone(), pages, cache.clone());

    // Build shared application state
    let state = Arc::new(bot::AppState {
        config: config.clone(),
        sessions: SessionStore::new(),
        quiz: QuizStore::new(),
        cache,
        llm,
        tts,
        orchestrator,
    });

    // Health endpoint runs beside the bot
    let port = config.http_port;
    tokio::spawn(async move {
        if let Err(err) = web::serve(port).await {
            tracing::error!("health endpoint failed: {err}");
        }
    });

    // Create the Telegram bot
    let bot = Bot::new(&config.telegram_bot_token);

    // Build the dispatcher
    let handler = bot::build_handler();

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
