//! Plugin system for command handlers.
//!
//! Add new plugins by:
//! 1. Creating a new file in this directory
//! 2. Adding `pub mod your_plugin;` below
//! 3. Adding the handler to `command_handler()`
//!
//! Every command is commander-only. Successful changes are confirmed with a
//! 👌 reaction and the command is deleted a few seconds later; failures are
//! answered with the error text.

pub mod admin;
pub mod reacting;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::bot::{AppState, ThrottledBot};
use crate::documents::CommandResult;
use crate::utils::{confirm_operation, html_escape, reply_html};

/// All bot commands.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Commands (commanders only):")]
pub enum Command {
    #[command(description = "Show this list")]
    Help,

    // Listing
    #[command(description = "List commanders")]
    Commanders,

    #[command(description = "List the emoji I react with")]
    Emojis,

    #[command(description = "List trigger patterns")]
    Triggers,

    #[command(description = "List channels I ignore in this chat")]
    Blacklist,

    // Triggers
    #[command(description = "Add a trigger pattern")]
    Addtrigger,

    #[command(description = "Remove a trigger pattern")]
    Rmtrigger,

    #[command(description = "Replace every trigger pattern (one per line)")]
    Settriggers,

    // Emoji
    #[command(description = "Add a reaction emoji")]
    Addemoji,

    #[command(description = "Remove a reaction emoji")]
    Rmemoji,

    #[command(description = "Replace every reaction emoji")]
    Setemojis,

    // Blacklist
    #[command(description = "Stop reacting in this channel")]
    Ignorehere,

    #[command(description = "Resume reacting in this channel")]
    Unignorehere,

    // Admin
    #[command(description = "Add a commander (id or reply)")]
    Addcommander,

    #[command(description = "Remove a commander (id or reply)")]
    Rmcommander,

    #[command(description = "Reload triggers and emoji from disk")]
    Reload,

    #[command(description = "Shut the bot down")]
    Stop,
}

/// Build the combined command handler.
///
/// Non-commanders are refused here, before any command runs.
pub fn command_handler() -> UpdateHandler<anyhow::Error> {
    use dptree::case;

    teloxide::filter_command::<Command, _>()
        .filter_async(require_commander)
        .branch(case![Command::Help].endpoint(handle_help))
        // Listing
        .branch(case![Command::Commanders].endpoint(admin::commanders_command))
        .branch(case![Command::Emojis].endpoint(reacting::emojis_command))
        .branch(case![Command::Triggers].endpoint(reacting::triggers_command))
        .branch(case![Command::Blacklist].endpoint(reacting::blacklist_command))
        // Triggers
        .branch(case![Command::Addtrigger].endpoint(reacting::addtrigger_command))
        .branch(case![Command::Rmtrigger].endpoint(reacting::rmtrigger_command))
        .branch(case![Command::Settriggers].endpoint(reacting::settriggers_command))
        // Emoji
        .branch(case![Command::Addemoji].endpoint(reacting::addemoji_command))
        .branch(case![Command::Rmemoji].endpoint(reacting::rmemoji_command))
        .branch(case![Command::Setemojis].endpoint(reacting::setemojis_command))
        // Blacklist
        .branch(case![Command::Ignorehere].endpoint(reacting::ignorehere_command))
        .branch(case![Command::Unignorehere].endpoint(reacting::unignorehere_command))
        // Admin
        .branch(case![Command::Addcommander].endpoint(admin::addcommander_command))
        .branch(case![Command::Rmcommander].endpoint(admin::rmcommander_command))
        .branch(case![Command::Reload].endpoint(admin::reload_command))
        .branch(case![Command::Stop].endpoint(admin::stop_command))
}

/// Let commanders through; anyone else gets an angry face and is dropped.
async fn require_commander(bot: ThrottledBot, msg: Message, state: AppState) -> bool {
    match state.permissions.require_commander(&bot, &msg).await {
        Ok(allowed) => allowed,
        Err(e) => {
            tracing::warn!("Commander check failed in chat {}: {}", msg.chat.id, e);
            false
        }
    }
}

/// Handle /help command.
async fn handle_help(bot: ThrottledBot, msg: Message) -> anyhow::Result<()> {
    reply_html(&bot, &msg, html_escape(&Command::descriptions().to_string())).await
}

/// Report the outcome of a change.
///
/// `Ok(true)` is confirmed, `Ok(false)` is answered with `unchanged`, and an
/// error is answered with its text.
pub(crate) async fn finish(
    bot: &ThrottledBot,
    msg: &Message,
    outcome: CommandResult<bool>,
    unchanged: &str,
) -> anyhow::Result<()> {
    match outcome {
        Ok(true) => {
            confirm_operation(bot, msg);
            Ok(())
        }
        Ok(false) => reply_html(bot, msg, unchanged).await,
        Err(e) => {
            tracing::warn!("Command failed in chat {}: {}", msg.chat.id, e);
            reply_html(bot, msg, format!("⚠️ {}", html_escape(&e.to_string()))).await
        }
    }
}

/// Reply with usage when a command is missing its argument.
pub(crate) async fn usage(bot: &ThrottledBot, msg: &Message, text: &str) -> anyhow::Result<()> {
    reply_html(bot, msg, format!("Usage: <code>{}</code>", html_escape(text))).await
}
