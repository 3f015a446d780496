//! Utility functions.
//!
//! Collection of helper functions used across the bot.

pub mod reply;

pub use reply::{confirm_operation, react, reply_html};

use teloxide::types::Message;

/// The guild a message belongs to: its chat, when that chat is a group.
pub fn guild_id(msg: &Message) -> Option<i64> {
    (msg.chat.is_group() || msg.chat.is_supergroup()).then_some(msg.chat.id.0)
}

/// The channel a message was posted in: its forum topic, or else the chat.
pub fn channel_id(msg: &Message) -> i64 {
    match msg.thread_id {
        Some(thread) if msg.is_topic_message => i64::from(thread.0.0),
        _ => msg.chat.id.0,
    }
}

/// Escape text for Telegram HTML parse mode.
pub fn html_escape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Everything after the command word, trimmed.
pub fn command_args(text: &str) -> &str {
    text.split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .unwrap_or("")
}
