//! Admin management commands.
//!
//! Commanders, reloading and shutdown.

use teloxide::prelude::*;
use teloxide::types::UserId;
use tracing::{info, warn};

use super::{finish, usage};
use crate::bot::{AppState, ThrottledBot};
use crate::cache::RecacheReason;
use crate::documents::ok_hand;
use crate::utils::{command_args, react, reply_html};

/// Handle /commanders - list everyone allowed to command the bot.
pub async fn commanders_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let lines: Vec<String> = state
        .documents
        .commanders()
        .into_iter()
        .map(|id| {
            let owner = if state.permissions.is_bot_owner(UserId(id)) { " (owner)" } else { "" };
            format!("• <a href=\"tg://user?id={id}\">{id}</a>{owner}")
        })
        .collect();

    let text = if lines.is_empty() {
        "No commanders.".to_string()
    } else {
        format!("<b>Commanders</b>\n{}", lines.join("\n"))
    };

    reply_html(&bot, &msg, text).await
}

/// Handle /addcommander <id> (or as a reply).
pub async fn addcommander_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(user_id) = target_user(&msg) else {
        return usage(&bot, &msg, "/addcommander <user id>, or reply to a user").await;
    };

    let outcome = state.documents.add_commander(user_id).await;
    finish(&bot, &msg, outcome, "Already a commander.").await
}

/// Handle /rmcommander <id> (or as a reply).
pub async fn rmcommander_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(user_id) = target_user(&msg) else {
        return usage(&bot, &msg, "/rmcommander <user id>, or reply to a user").await;
    };

    if state.permissions.is_bot_owner(UserId(user_id)) {
        // Owners keep commanding through OWNER_IDS regardless.
        warn!(user_id, "removing a bot owner from the stored commanders");
    }

    let outcome = state.documents.remove_commander(user_id).await;
    finish(&bot, &msg, outcome, "Not a commander.").await
}

/// Handle /reload - re-read triggers and emoji from disk.
pub async fn reload_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let outcome = state.documents.recompile_patterns().await.map(|count| {
        info!(count, "patterns recompiled on request");
        true
    });

    if outcome.is_ok() {
        // The listener reloads the emoji list.
        state.recache.fire(RecacheReason::Manual);
    }

    finish(&bot, &msg, outcome, "").await
}

/// Handle /stop - acknowledge, then stop the dispatcher.
pub async fn stop_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    react(&bot, msg.chat.id, msg.id, &ok_hand()).await?;

    info!("Shutdown requested from chat {}", msg.chat.id);
    match state.shutdown.get() {
        Some(token) => {
            // The returned future waits for this very handler; don't await it.
            if token.shutdown().is_err() {
                warn!("Dispatcher is not running, nothing to stop");
            }
        }
        None => warn!("No shutdown handle registered"),
    }

    Ok(())
}

/// The user a commander command targets: the replied-to author, or the first argument.
fn target_user(msg: &Message) -> Option<u64> {
    if let Some(user) = msg.reply_to_message().and_then(|reply| reply.from.as_ref()) {
        return Some(user.id.0);
    }
    parse_user_id(command_args(msg.text().unwrap_or("")))
}

fn parse_user_id(arg: &str) -> Option<u64> {
    arg.split_whitespace().next()?.parse().ok()
}
