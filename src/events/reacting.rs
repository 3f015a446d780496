//! Telegram side of the trigger engine.

use futures::FutureExt;
use futures::future::BoxFuture;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use tracing::debug;

use crate::bot::{AppState, ThrottledBot};
use crate::documents::Emoji;
use crate::reacting::InboundMessage;
use crate::utils::{self, react};

/// An inbound Telegram message as the trigger engine sees it.
///
/// Group and supergroup chats are guilds; forum topics are channels, and a
/// chat without topics is its own single channel.
pub struct TelegramMessage {
    bot: ThrottledBot,
    chat_id: ChatId,
    message_id: MessageId,
    body: String,
    guild_id: Option<i64>,
    channel_id: i64,
    author_id: u64,
    author_is_bot: bool,
}

impl TelegramMessage {
    pub fn new(bot: &ThrottledBot, msg: &Message) -> Self {
        Self {
            bot: bot.clone(),
            chat_id: msg.chat.id,
            message_id: msg.id,
            body: msg.text().or_else(|| msg.caption()).unwrap_or_default().to_string(),
            guild_id: utils::guild_id(msg),
            channel_id: utils::channel_id(msg),
            author_id: msg.from.as_ref().map(|u| u.id.0).unwrap_or_default(),
            // Anonymous senders are treated like bots and never reacted to.
            author_is_bot: msg.from.as_ref().is_none_or(|u| u.is_bot),
        }
    }
}

impl InboundMessage for TelegramMessage {
    fn body(&self) -> &str {
        &self.body
    }

    fn author_is_bot(&self) -> bool {
        self.author_is_bot
    }

    fn guild_id(&self) -> Option<i64> {
        self.guild_id
    }

    fn channel_id(&self) -> i64 {
        self.channel_id
    }

    fn author_id(&self) -> u64 {
        self.author_id
    }

    fn react(&self, emoji: &Emoji) -> BoxFuture<'static, anyhow::Result<()>> {
        let bot = self.bot.clone();
        let chat_id = self.chat_id;
        let message_id = self.message_id;
        let emoji = emoji.clone();

        async move { react(&bot, chat_id, message_id, &emoji).await }.boxed()
    }
}

/// Run the trigger engine on one message.
pub fn check_reaction(bot: &ThrottledBot, msg: &Message, state: &AppState) {
    let message = TelegramMessage::new(bot, msg);
    let decision = state.engine.on_message(&message);
    debug!("Reaction decision for message {} in chat {}: {:?}", msg.id.0, msg.chat.id, decision);
}
