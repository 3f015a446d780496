//! Per-chat set of channels the bot must not react in.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Guild id (as a string key) to the set of blacklisted channel ids.
///
/// A guild key is only present while its channel set is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blacklist(BTreeMap<String, BTreeSet<i64>>);

impl Blacklist {
    /// Add a channel. Returns `false` if it was already listed.
    pub fn insert(&mut self, guild_id: i64, channel_id: i64) -> bool {
        self.0.entry(guild_id.to_string()).or_default().insert(channel_id)
    }

    /// Remove a channel. Returns `false` if it was not listed.
    ///
    /// Drops the guild entry once its last channel is gone.
    pub fn remove(&mut self, guild_id: i64, channel_id: i64) -> bool {
        let key = guild_id.to_string();
        let Some(channels) = self.0.get_mut(&key) else {
            return false;
        };

        let removed = channels.remove(&channel_id);
        if channels.is_empty() {
            self.0.remove(&key);
        }
        removed
    }

    pub fn contains(&self, guild_id: i64, channel_id: i64) -> bool {
        self.0
            .get(&guild_id.to_string())
            .is_some_and(|channels| channels.contains(&channel_id))
    }

    /// Blacklisted channels of one guild, in ascending order.
    pub fn channels(&self, guild_id: i64) -> Vec<i64> {
        self.0
            .get(&guild_id.to_string())
            .map(|channels| channels.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn guild_count(&self) -> usize {
        self.0.len()
    }
}
