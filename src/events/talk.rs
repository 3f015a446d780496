//! Talk requests.
//!
//! A commander writes `kat: hello` and the bot deletes the request, types
//! for a while, then says `hello` itself.

use std::time::Duration;

use rand::Rng;
use teloxide::prelude::*;
use teloxide::types::ChatAction;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::bot::{AppState, ThrottledBot};
use crate::documents::angry;
use crate::utils::react;

/// Telegram clears a chat action after five seconds.
const TYPING_REFRESH: Duration = Duration::from_secs(4);

/// Strip the `<name>:` prefix, returning what the bot should say.
///
/// The prefix is matched case-insensitively after leading whitespace.
pub fn strip_talk_prefix<'a>(body: &'a str, bot_name: &str) -> Option<&'a str> {
    let prefix = format!("{}:", bot_name.to_lowercase());
    let body = body.trim_start();
    let head = body.get(..prefix.len())?;

    head.to_lowercase()
        .eq(&prefix)
        .then(|| body[prefix.len()..].trim_start())
}

/// How long to pretend to type `text`: ten milliseconds per character plus
/// one to three seconds.
pub fn talk_time<R: Rng + ?Sized>(text: &str, rng: &mut R) -> Duration {
    let base = text.chars().count() as f64 * 0.01;
    Duration::from_secs_f64(base + rng.gen_range(1.0..3.0))
}

/// Handle a message if it is a talk request.
///
/// Returns whether the message was one, so the caller can skip the trigger
/// engine for it.
pub async fn check_talk(bot: &ThrottledBot, msg: &Message, state: &AppState) -> anyhow::Result<bool> {
    let Some(body) = msg.text() else {
        return Ok(false);
    };
    let Some(said) = strip_talk_prefix(body, &state.bot_name) else {
        return Ok(false);
    };

    let allowed = msg
        .from
        .as_ref()
        .is_some_and(|user| state.permissions.is_commander(user.id));
    if !allowed {
        debug!("Ignoring talk request from non-commander in chat {}", msg.chat.id);
        react(bot, msg.chat.id, msg.id, &angry()).await?;
        return Ok(true);
    }

    let duration = talk_time(said, &mut rand::thread_rng());
    tokio::spawn(speak(bot.clone(), msg.clone(), said.to_string(), duration));

    Ok(true)
}

async fn speak(bot: ThrottledBot, msg: Message, text: String, duration: Duration) {
    let chat_id = msg.chat.id;
    let thread_id = msg.thread_id.filter(|_| msg.is_topic_message);

    {
        let bot = bot.clone();
        tokio::spawn(async move {
            let _ = bot.delete_message(chat_id, msg.id).await;
        });
    }

    let deadline = Instant::now() + duration;
    while Instant::now() < deadline {
        let mut typing = bot.send_chat_action(chat_id, ChatAction::Typing);
        if let Some(thread) = thread_id {
            typing = typing.message_thread_id(thread);
        }
        if let Err(e) = typing.await {
            debug!("Failed to send typing action to chat {}: {}", chat_id, e);
        }
        tokio::time::sleep_until(deadline.min(Instant::now() + TYPING_REFRESH)).await;
    }

    if text.is_empty() {
        return;
    }

    let mut send = bot.send_message(chat_id, text);
    if let Some(thread) = thread_id {
        send = send.message_thread_id(thread);
    }
    if let Err(e) = send.await {
        warn!("Failed to speak in chat {}: {}", chat_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_strip_talk_prefix() {
        assert_eq!(strip_talk_prefix("Kat: hello there", "Kat"), Some("hello there"));
        assert_eq!(strip_talk_prefix("   KAT:hi", "Kat"), Some("hi"));
        assert_eq!(strip_talk_prefix("kat:", "Kat"), Some(""));
    }

    #[test]
    fn test_strip_talk_prefix_rejects_other_text() {
        assert_eq!(strip_talk_prefix("hello kat: there", "Kat"), None);
        assert_eq!(strip_talk_prefix("kat hello", "Kat"), None);
        assert_eq!(strip_talk_prefix("ka", "Kat"), None);
        // Multi-byte text shorter than the prefix must not panic.
        assert_eq!(strip_talk_prefix("ĸä", "Kat"), None);
        assert_eq!(strip_talk_prefix("kät: x", "Kat"), None);
    }

    #[test]
    fn test_talk_time_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let text = "a".repeat(200);

        for _ in 0..100 {
            let t = talk_time(&text, &mut rng);
            assert!(t >= Duration::from_secs(3), "{t:?}");
            assert!(t < Duration::from_secs(5), "{t:?}");
        }
    }

    #[test]
    fn test_talk_time_counts_characters() {
        let mut rng = StdRng::seed_from_u64(3);
        let text = "я".repeat(100);

        for _ in 0..100 {
            let t = talk_time(&text, &mut rng);
            assert!(t >= Duration::from_secs(2), "{t:?}");
            assert!(t < Duration::from_secs(4), "{t:?}");
        }
    }

    #[test]
    fn test_talk_time_empty_text() {
        let mut rng = StdRng::seed_from_u64(1);
        let t = talk_time("", &mut rng);
        assert!(t >= Duration::from_secs(1) && t < Duration::from_secs(3));
    }
}
