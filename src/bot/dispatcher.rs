//! Message dispatcher setup.
//!
//! Builds the dispatcher with the command handlers and event handlers.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use teloxide::adaptors::Throttle;
use teloxide::dispatching::{ShutdownToken, UpdateHandler};
use teloxide::prelude::*;
use tracing::warn;

use crate::cache::RecacheSignal;
use crate::documents::Documents;
use crate::events;
use crate::permissions::Permissions;
use crate::plugins;
use crate::reacting::{ReactingConfig, TriggerEngine};

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ThrottledBot = Throttle<Bot>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Stored documents and their derived caches.
    pub documents: Arc<Documents>,

    /// Trigger engine deciding on reactions.
    pub engine: Arc<TriggerEngine>,

    /// Fired whenever the set of usable emoji may have changed.
    pub recache: RecacheSignal,

    /// Commander checks.
    pub permissions: Permissions,

    /// Name the bot answers to in talk requests.
    pub bot_name: String,

    /// Stops the dispatcher; set once it is built.
    pub shutdown: Arc<OnceCell<ShutdownToken>>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        documents: Arc<Documents>,
        recache: RecacheSignal,
        reacting: ReactingConfig,
        owner_ids: Vec<u64>,
        bot_name: String,
    ) -> Self {
        let engine = Arc::new(TriggerEngine::new(&documents, reacting));
        let permissions = Permissions::with_owners(Arc::clone(&documents), owner_ids);

        Self {
            documents,
            engine,
            recache,
            permissions,
            bot_name,
            shutdown: Arc::new(OnceCell::new()),
        }
    }
}

/// Build the dispatcher with all handlers.
pub fn build_dispatcher(
    bot: ThrottledBot,
    state: AppState,
) -> Dispatcher<ThrottledBot, anyhow::Error, teloxide::dispatching::DefaultKey> {
    let shutdown = Arc::clone(&state.shutdown);

    let dispatcher = Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build();

    if shutdown.set(dispatcher.shutdown_token()).is_err() {
        warn!("Dispatcher built twice for the same state; /stop keeps the first one");
    }

    dispatcher
}

/// Build the handler schema.
fn schema() -> UpdateHandler<anyhow::Error> {
    use teloxide::dispatching::UpdateFilterExt;

    // Commands first; everything else goes through talk + reacting
    let message_handler = Update::filter_message()
        .branch(plugins::command_handler())
        .branch(events::message_event_handler());

    // The bot's own membership changes (joined / left a chat)
    let membership_handler = Update::filter_my_chat_member()
        .branch(events::membership_handler());

    dptree::entry()
        .branch(message_handler)
        .branch(membership_handler)
}
