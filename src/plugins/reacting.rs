//! Trigger, emoji and blacklist commands.

use teloxide::prelude::*;

use super::{finish, usage};
use crate::bot::{AppState, ThrottledBot};
use crate::utils::{self, command_args, html_escape, reply_html};

/// Handle /triggers - list the stored trigger patterns.
pub async fn triggers_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let sources = state.documents.pattern_sources();

    let text = if sources.is_empty() {
        "No trigger patterns.".to_string()
    } else {
        let lines: Vec<String> = sources
            .iter()
            .map(|source| format!("• <code>{}</code>", html_escape(source)))
            .collect();
        format!("<b>Trigger patterns</b>\n{}", lines.join("\n"))
    };

    reply_html(&bot, &msg, text).await
}

/// Handle /addtrigger <regex>.
pub async fn addtrigger_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let pattern = command_args(msg.text().unwrap_or(""));
    if pattern.is_empty() {
        return usage(&bot, &msg, "/addtrigger <regex>").await;
    }

    let outcome = state.documents.add_pattern(pattern).await;
    finish(&bot, &msg, outcome, "That pattern is already a trigger.").await
}

/// Handle /rmtrigger <regex>.
pub async fn rmtrigger_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let pattern = command_args(msg.text().unwrap_or(""));
    if pattern.is_empty() {
        return usage(&bot, &msg, "/rmtrigger <regex>").await;
    }

    let outcome = state.documents.remove_pattern(pattern).await;
    finish(&bot, &msg, outcome, "No such trigger pattern.").await
}

/// Handle /settriggers - one pattern per line after the command.
pub async fn settriggers_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let sources = pattern_lines(command_args(msg.text().unwrap_or("")));
    if sources.is_empty() {
        return usage(&bot, &msg, "/settriggers <regex>\n<regex>…").await;
    }

    let outcome = state.documents.set_pattern_list(sources).await.map(|_| true);
    finish(&bot, &msg, outcome, "").await
}

/// Handle /emojis - list loaded emoji and any stored ones that no longer resolve.
pub async fn emojis_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let loaded = state.documents.emoji_cache().current();
    let stale: Vec<String> = state
        .documents
        .emoji_tokens()
        .into_iter()
        .filter(|token| !loaded.iter().any(|e| e.answers_to(token)))
        .collect();

    let mut text = if loaded.is_empty() {
        "No reaction emoji loaded.".to_string()
    } else {
        let shown: Vec<String> = loaded.iter().map(|e| e.to_string()).collect();
        format!("<b>Reacting with</b>\n{}", shown.join(" "))
    };
    if !stale.is_empty() {
        text.push_str(&format!("\n\n<b>Unavailable</b>\n{}", html_escape(&stale.join(" "))));
    }

    reply_html(&bot, &msg, text).await
}

/// Handle /addemoji <emoji>.
pub async fn addemoji_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let token = command_args(msg.text().unwrap_or(""));
    if token.is_empty() {
        return usage(&bot, &msg, "/addemoji <emoji>").await;
    }

    let outcome = state.documents.add_emoji(token).await;
    finish(&bot, &msg, outcome, "I already react with that.").await
}

/// Handle /rmemoji <emoji>.
pub async fn rmemoji_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let token = command_args(msg.text().unwrap_or(""));
    if token.is_empty() {
        return usage(&bot, &msg, "/rmemoji <emoji>").await;
    }

    let outcome = state.documents.remove_emoji(token).await;
    finish(&bot, &msg, outcome, "I don't react with that.").await
}

/// Handle /setemojis <emoji>… - replace the whole list.
pub async fn setemojis_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let tokens: Vec<&str> = command_args(msg.text().unwrap_or("")).split_whitespace().collect();
    if tokens.is_empty() {
        return usage(&bot, &msg, "/setemojis <emoji> <emoji>…").await;
    }

    let outcome = match state.documents.resolve_emojis(&tokens) {
        Ok(emojis) => state.documents.set_emoji_list(&emojis).await.map(|_| true),
        Err(e) => Err(e),
    };
    finish(&bot, &msg, outcome, "").await
}

/// Handle /blacklist - list ignored channels of this chat.
pub async fn blacklist_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(guild_id) = utils::guild_id(&msg) else {
        return reply_html(&bot, &msg, "⚠️ This command only works in groups.").await;
    };

    let channels = state.documents.blacklisted_channels(guild_id);
    let mut text = if channels.is_empty() {
        "I react everywhere in this chat.".to_string()
    } else {
        let lines: Vec<String> = channels
            .iter()
            .map(|c| {
                if *c == guild_id {
                    "• whole chat".to_string()
                } else {
                    format!("• topic <code>{c}</code>")
                }
            })
            .collect();
        format!("<b>Ignored here</b>\n{}", lines.join("\n"))
    };

    if state.documents.is_blacklisted(guild_id, utils::channel_id(&msg)) {
        text.push_str("\n\nThis channel is ignored.");
    }
    let guilds = state.documents.blacklist_store().get().guild_count();
    text.push_str(&format!("\n{guilds} chat(s) have ignored channels."));

    reply_html(&bot, &msg, text).await
}

/// Handle /ignorehere - stop reacting in the current channel.
pub async fn ignorehere_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(guild_id) = utils::guild_id(&msg) else {
        return reply_html(&bot, &msg, "⚠️ This command only works in groups.").await;
    };

    let outcome = state
        .documents
        .add_blacklist_entry(guild_id, utils::channel_id(&msg))
        .await;
    finish(&bot, &msg, outcome, "I already ignore this channel.").await
}

/// Handle /unignorehere - resume reacting in the current channel.
pub async fn unignorehere_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let Some(guild_id) = utils::guild_id(&msg) else {
        return reply_html(&bot, &msg, "⚠️ This command only works in groups.").await;
    };

    let outcome = state
        .documents
        .remove_blacklist_entry(guild_id, utils::channel_id(&msg))
        .await;
    finish(&bot, &msg, outcome, "I don't ignore this channel.").await
}

/// Split a multi-line argument into trimmed, non-empty patterns.
fn pattern_lines(args: &str) -> Vec<String> {
    args.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
