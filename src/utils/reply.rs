//! Reply helper utilities.
//!
//! Provides consistent feedback behavior across all handlers.

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode, ReactionType, ReplyParameters};
use tracing::warn;

use crate::bot::ThrottledBot;
use crate::documents::{Emoji, ok_hand};

/// How long a confirmed command stays visible before it is deleted.
const CONFIRM_LINGER: Duration = Duration::from_secs(5);

/// Place a single reaction on a message.
pub async fn react(
    bot: &ThrottledBot,
    chat_id: ChatId,
    message_id: MessageId,
    emoji: &Emoji,
) -> anyhow::Result<()> {
    bot.set_message_reaction(chat_id, message_id)
        .reaction(vec![ReactionType::Emoji {
            emoji: emoji.display.clone(),
        }])
        .await?;
    Ok(())
}

/// Confirm a command: react with an OK hand, then delete the command
/// message a few seconds later.
///
/// Runs in the background; failures are logged and otherwise ignored.
pub fn confirm_operation(bot: &ThrottledBot, msg: &Message) {
    let bot = bot.clone();
    let chat_id = msg.chat.id;
    let message_id = msg.id;

    tokio::spawn(async move {
        if let Err(e) = react(&bot, chat_id, message_id, &ok_hand()).await {
            warn!("Failed to confirm command in chat {}: {}", chat_id, e);
        }
        tokio::time::sleep(CONFIRM_LINGER).await;
        let _ = bot.delete_message(chat_id, message_id).await;
    });
}

/// Reply to `msg` with HTML-formatted text.
pub async fn reply_html(bot: &ThrottledBot, msg: &Message, text: impl Into<String>) -> anyhow::Result<()> {
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}
