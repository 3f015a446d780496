//! Commander checks.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::UserId;
use tracing::debug;

use crate::bot::ThrottledBot;
use crate::documents::{Documents, angry};
use crate::utils::react;

/// Decides who may command the bot.
///
/// Bot owners (from OWNER_IDS env) always pass, even if they were removed
/// from the stored commander list since startup.
#[derive(Clone)]
pub struct Permissions {
    documents: Arc<Documents>,
    /// Bot owner IDs.
    owner_ids: Vec<u64>,
}

impl Permissions {
    /// Create a new permission checker with bot owner IDs.
    pub fn with_owners(documents: Arc<Documents>, owner_ids: Vec<u64>) -> Self {
        Self {
            documents,
            owner_ids,
        }
    }

    /// Check if a user is a bot owner.
    #[inline]
    pub fn is_bot_owner(&self, user_id: UserId) -> bool {
        self.owner_ids.contains(&user_id.0)
    }

    /// Check if a user may command the bot.
    pub fn is_commander(&self, user_id: UserId) -> bool {
        self.is_bot_owner(user_id) || self.documents.is_commander(user_id.0)
    }

    /// Check the sender of `msg`, reacting with an angry face when refused.
    ///
    /// Returns whether the sender is a commander.
    pub async fn require_commander(&self, bot: &ThrottledBot, msg: &Message) -> anyhow::Result<bool> {
        let allowed = msg
            .from
            .as_ref()
            .is_some_and(|user| self.is_commander(user.id));

        if !allowed {
            debug!("Refusing command from non-commander in chat {}", msg.chat.id);
            react(bot, msg.chat.id, msg.id, &angry()).await?;
        }

        Ok(allowed)
    }
}
