//! Kat - a Telegram bot that reacts to messages.
//!
//! When a message matches one of the configured trigger patterns, Kat may
//! react to it with a random emoji after a random delay.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `store` - Cached JSON documents with ordered asynchronous writes
//! - `cache` - Derived caches and the recache signal
//! - `documents` - The bot's stores and their derived caches
//! - `reacting` - Trigger engine and cooldown bucket
//! - `permissions` - Commander checks
//! - `bot` - Core bot functionality (with Throttle for API rate limiting)
//! - `plugins` - Command handlers
//! - `events` - Talk, reacting and membership event handlers
//! - `utils` - Utility functions

mod bot;
mod cache;
mod config;
mod documents;
mod events;
mod permissions;
mod plugins;
mod reacting;
mod store;
mod utils;

use std::sync::Arc;

use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cache::{RecacheReason, RecacheSignal};
use config::Config;
use documents::{Documents, ReactionDirectory, spawn_recache_listener};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("kat=info,teloxide=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("Starting Kat bot...");

    let config = Config::from_env();
    info!("Configuration loaded successfully");
    info!("Bot mode: {:?}", config.bot_mode);

    // One scheduler thread; file I/O goes to a bounded blocking pool.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .max_blocking_threads(config.io_workers)
        .build()?;

    runtime.block_on(run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    // Opening writes missing documents synchronously, so keep it off the scheduler.
    info!("Opening documents in {}", config.data_dir.display());
    let documents = {
        let data_dir = config.data_dir.clone();
        let owner_ids = config.owner_ids.clone();
        tokio::task::spawn_blocking(move || {
            Documents::open(&data_dir, &owner_ids, Arc::new(ReactionDirectory::telegram()))
        })
        .await??
    };
    let documents = Arc::new(documents);
    info!("Documents loaded");

    let recache = RecacheSignal::new();
    spawn_recache_listener(Arc::clone(&documents), &recache);
    recache.fire(RecacheReason::Startup);

    // Initialize bot with Throttle for automatic rate limiting
    // This respects Telegram's rate limits:
    // - 30 messages per second globally
    // - 1 message per second to the same chat
    // - 20 messages per minute to the same group
    let bot = Bot::new(&config.bot_token).throttle(Limits::default());
    info!("Bot initialized with rate limiting (Throttle)");

    let me = bot.get_me().await?;
    info!("Bot username: @{}, answering to \"{}\"", me.username(), config.bot_name);

    if config.owner_ids.is_empty() {
        info!("No owner IDs configured (OWNER_IDS is empty)");
    } else {
        info!("Bot owners: {:?}", config.owner_ids);
    }

    let state = bot::AppState::new(
        documents,
        recache,
        config.reacting.clone(),
        config.owner_ids.clone(),
        config.bot_name.clone(),
    );

    let dispatcher = bot::build_dispatcher(bot.clone(), state);

    bot::run(&config, dispatcher, bot).await
}
