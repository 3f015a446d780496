//! Event handler system.
//!
//! Plain messages go through talk first, then the trigger engine. The bot's
//! own membership changes feed the recache signal.

pub mod reacting;
pub mod talk;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::ChatMemberUpdated;
use tracing::{debug, error, info};

use crate::bot::{AppState, ThrottledBot};
use crate::cache::RecacheReason;

/// Build the message event handler.
///
/// Commands are routed earlier; anything else reaching this branch is an
/// ordinary message.
pub fn message_event_handler() -> UpdateHandler<anyhow::Error> {
    dptree::endpoint(unified_message_handler)
}

/// Unified message handler that runs all sub-handlers.
async fn unified_message_handler(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let text = msg.text().unwrap_or("");
    let is_command = text.starts_with('/');

    debug!(
        "unified_message_handler: chat={}, text='{}', is_command={}",
        msg.chat.id,
        text.chars().take(30).collect::<String>(),
        is_command
    );

    // Commands refused or unknown to the command handler end here
    if is_command {
        return Ok(());
    }

    match talk::check_talk(&bot, &msg, &state).await {
        Ok(true) => return Ok(()),
        Ok(false) => {}
        Err(e) => {
            error!("Talk error: {}", e);
            return Ok(());
        }
    }

    reacting::check_reaction(&bot, &msg, &state);

    Ok(())
}

/// Build the handler for the bot's own membership changes.
pub fn membership_handler() -> UpdateHandler<anyhow::Error> {
    dptree::filter_map(membership_change).endpoint(membership_changed)
}

/// Classify a `my_chat_member` update as a join or a leave.
fn membership_change(update: ChatMemberUpdated) -> Option<RecacheReason> {
    let old = &update.old_chat_member;
    let new = &update.new_chat_member;

    match (old.is_present(), new.is_present()) {
        (false, true) => Some(RecacheReason::ChatJoined),
        (true, false) => Some(RecacheReason::ChatLeft),
        _ => None,
    }
}

async fn membership_changed(update: ChatMemberUpdated, reason: RecacheReason, state: AppState) -> anyhow::Result<()> {
    info!("{} ({})", reason, update.chat.id);
    state.recache.fire(reason);
    Ok(())
}
