//! The bot's persistent documents and the caches derived from them.
//!
//! Every mutation writes the store first and rebuilds the affected derived
//! cache before returning, so callers always read their own writes.

mod blacklist;
mod emoji;
mod error;
mod listener;
mod trigger;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::cache::DerivedCache;
use crate::store::{JsonStore, StoreResult};

pub use blacklist::Blacklist;
pub use emoji::{Emoji, EmojiDirectory, ReactionDirectory, angry, ok_hand};
pub use error::{CommandError, CommandResult};
pub use listener::spawn_recache_listener;
pub use trigger::Trigger;

const COMMANDERS_FILE: &str = "authorized_commanders.json";
const EMOJIS_FILE: &str = "react_emojis.json";
const TRIGGERS_FILE: &str = "react_triggers.json";
const BLACKLIST_FILE: &str = "dont_react_in.json";

/// Pattern written to a fresh trigger list.
const DEFAULT_TRIGGER: &str = "Kat";

/// Stores, derived caches and the directory emoji are resolved against.
pub struct Documents {
    commanders: JsonStore<Vec<u64>>,
    emoji_tokens: JsonStore<Vec<String>>,
    pattern_sources: JsonStore<Vec<String>>,
    blacklist: JsonStore<Blacklist>,
    patterns: DerivedCache<Trigger>,
    emojis: DerivedCache<Emoji>,
    directory: Arc<dyn EmojiDirectory>,
}

fn compile(source: &str) -> CommandResult<Trigger> {
    Trigger::compile(source).map_err(|e| CommandError::Compilation {
        pattern: source.to_string(),
        source: e,
    })
}

impl Documents {
    /// Open every document under `data_dir` and build the derived caches.
    ///
    /// Blocks on file I/O. Run it on the blocking pool, never on the scheduler.
    pub fn open(
        data_dir: &Path,
        owner_ids: &[u64],
        directory: Arc<dyn EmojiDirectory>,
    ) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("cannot create data directory {}", data_dir.display()))?;

        let commanders = JsonStore::open(data_dir.join(COMMANDERS_FILE), Vec::new())?;
        let emoji_tokens = JsonStore::open(data_dir.join(EMOJIS_FILE), Vec::new())?;
        let pattern_sources =
            JsonStore::open(data_dir.join(TRIGGERS_FILE), vec![DEFAULT_TRIGGER.to_string()])?;
        let blacklist = JsonStore::open(data_dir.join(BLACKLIST_FILE), Blacklist::default())?;

        let mut ids = commanders.get();
        let missing: Vec<u64> = owner_ids.iter().copied().filter(|id| !ids.contains(id)).collect();
        if !missing.is_empty() {
            info!(?missing, "adding owners to commanders");
            ids.extend(missing);
            commanders.set_blocking(ids)?;
        }

        let documents = Self {
            commanders,
            emoji_tokens,
            pattern_sources,
            blacklist,
            patterns: DerivedCache::new("patterns"),
            emojis: DerivedCache::new("emojis"),
            directory,
        };

        let patterns = documents.rebuild_patterns().context("stored trigger list is invalid")?;
        let emojis = documents.rebuild_emojis();
        info!(patterns, emojis, "documents loaded");

        Ok(documents)
    }

    // ── triggers ─────────────────────────────────────────────────────

    /// Compiled trigger cache, shared with the trigger engine.
    pub fn pattern_cache(&self) -> DerivedCache<Trigger> {
        self.patterns.clone()
    }

    pub fn pattern_sources(&self) -> Vec<String> {
        self.pattern_sources.get()
    }

    /// Add a trigger pattern. Returns `false` if it was already present.
    ///
    /// A pattern that does not compile is rejected and nothing is written.
    pub async fn add_pattern(&self, source: &str) -> CommandResult<bool> {
        compile(source)?;

        let mut sources = self.pattern_sources.get();
        if sources.iter().any(|s| s == source) {
            return Ok(false);
        }
        sources.push(source.to_string());

        self.commit_patterns(sources).await?;
        info!(pattern = source, "trigger added");
        Ok(true)
    }

    /// Remove a trigger pattern by its exact source text.
    pub async fn remove_pattern(&self, source: &str) -> CommandResult<bool> {
        let mut sources = self.pattern_sources.get();
        let before = sources.len();
        sources.retain(|s| s != source);
        if sources.len() == before {
            return Ok(false);
        }

        self.commit_patterns(sources).await?;
        info!(pattern = source, "trigger removed");
        Ok(true)
    }

    /// Replace the whole trigger list. Rejected entirely if any entry fails to compile.
    pub async fn set_pattern_list(&self, sources: Vec<String>) -> CommandResult<usize> {
        DerivedCache::<Trigger>::convert_all(&sources, compile)?;
        self.commit_patterns(sources).await
    }

    /// Re-read the trigger list from disk and recompile it.
    pub async fn recompile_patterns(&self) -> CommandResult<usize> {
        self.pattern_sources.reload_from_disk().await?;
        self.rebuild_patterns()
    }

    async fn commit_patterns(&self, sources: Vec<String>) -> CommandResult<usize> {
        let persisted = self.pattern_sources.set(sources).await;
        // The cache follows the in-memory list even when the flush failed.
        let count = self.rebuild_patterns()?;
        persisted?;
        Ok(count)
    }

    fn rebuild_patterns(&self) -> CommandResult<usize> {
        let built = self.patterns.try_rebuild(&self.pattern_sources, compile)?;
        for trigger in &built {
            info!(pattern = trigger.source(), "loaded pattern");
        }
        Ok(built.len())
    }

    // ── emoji ────────────────────────────────────────────────────────

    /// Resolved emoji cache, shared with the trigger engine.
    pub fn emoji_cache(&self) -> DerivedCache<Emoji> {
        self.emojis.clone()
    }

    /// Raw tokens as stored, including ones that currently do not resolve.
    pub fn emoji_tokens(&self) -> Vec<String> {
        self.emoji_tokens.get()
    }

    /// Add an emoji by display form or name. Returns `false` if already stored.
    pub async fn add_emoji(&self, token: &str) -> CommandResult<bool> {
        let emoji = self
            .directory
            .find(token)
            .ok_or_else(|| CommandError::UnknownEmoji(token.to_string()))?;

        let mut tokens = self.emoji_tokens.get();
        if tokens.iter().any(|t| emoji.answers_to(t)) {
            return Ok(false);
        }
        tokens.push(emoji.display.clone());

        self.commit_emojis(tokens).await?;
        info!(emoji = %emoji, "emoji added");
        Ok(true)
    }

    /// Remove an emoji given either the stored token, its display form or its name.
    pub async fn remove_emoji(&self, token: &str) -> CommandResult<bool> {
        let resolved = self.directory.find(token);

        let mut tokens = self.emoji_tokens.get();
        let before = tokens.len();
        tokens.retain(|t| t != token && !resolved.as_ref().is_some_and(|e| e.answers_to(t)));
        if tokens.len() == before {
            return Ok(false);
        }

        self.commit_emojis(tokens).await?;
        info!(%token, "emoji removed");
        Ok(true)
    }

    /// Resolve every token against the directory, failing on the first unknown one.
    pub fn resolve_emojis<S: AsRef<str>>(&self, tokens: &[S]) -> CommandResult<Vec<Emoji>> {
        tokens
            .iter()
            .map(|token| {
                let token = token.as_ref();
                self.directory
                    .find(token)
                    .ok_or_else(|| CommandError::UnknownEmoji(token.to_string()))
            })
            .collect()
    }

    /// Replace the whole emoji list.
    pub async fn set_emoji_list(&self, emojis: &[Emoji]) -> CommandResult<usize> {
        let tokens = emojis.iter().map(|e| e.display.clone()).collect();
        self.commit_emojis(tokens).await
    }

    /// Re-read the emoji list from disk and resolve it again.
    ///
    /// Called whenever the set of usable emoji may have changed.
    pub async fn reload_emoji_cache(&self) -> StoreResult<usize> {
        self.emoji_tokens.reload_from_disk().await?;
        Ok(self.rebuild_emojis())
    }

    async fn commit_emojis(&self, tokens: Vec<String>) -> CommandResult<usize> {
        let persisted = self.emoji_tokens.set(tokens).await;
        let count = self.rebuild_emojis();
        persisted?;
        info!(count, "emoji list changed, cache rebuilt");
        Ok(count)
    }

    fn rebuild_emojis(&self) -> usize {
        let directory = Arc::clone(&self.directory);
        self.emojis
            .rebuild(&self.emoji_tokens, &move |token: &str| directory.find(token))
            .len()
    }

    // ── blacklist ────────────────────────────────────────────────────

    pub fn blacklist_store(&self) -> JsonStore<Blacklist> {
        self.blacklist.clone()
    }

    pub fn is_blacklisted(&self, guild_id: i64, channel_id: i64) -> bool {
        self.blacklist.get().contains(guild_id, channel_id)
    }

    pub fn blacklisted_channels(&self, guild_id: i64) -> Vec<i64> {
        self.blacklist.get().channels(guild_id)
    }

    /// Stop reacting in a channel. Returns `false` if it was already blacklisted.
    pub async fn add_blacklist_entry(&self, guild_id: i64, channel_id: i64) -> CommandResult<bool> {
        let mut blacklist = self.blacklist.get();
        if !blacklist.insert(guild_id, channel_id) {
            return Ok(false);
        }

        self.blacklist.set(blacklist).await?;
        info!(guild_id, channel_id, "channel blacklisted");
        Ok(true)
    }

    /// Resume reacting in a channel. Returns `false` if it was not blacklisted.
    pub async fn remove_blacklist_entry(&self, guild_id: i64, channel_id: i64) -> CommandResult<bool> {
        let mut blacklist = self.blacklist.get();
        if !blacklist.remove(guild_id, channel_id) {
            return Ok(false);
        }

        self.blacklist.set(blacklist).await?;
        info!(guild_id, channel_id, "channel removed from blacklist");
        Ok(true)
    }

    // ── commanders ───────────────────────────────────────────────────

    pub fn commanders(&self) -> Vec<u64> {
        self.commanders.get()
    }

    pub fn is_commander(&self, user_id: u64) -> bool {
        self.commanders.get().contains(&user_id)
    }

    pub async fn add_commander(&self, user_id: u64) -> CommandResult<bool> {
        if self.is_commander(user_id) {
            return Ok(false);
        }

        self.commanders.update(|ids| ids.push(user_id)).await?;
        info!(user_id, "commander added");
        Ok(true)
    }

    pub async fn remove_commander(&self, user_id: u64) -> CommandResult<bool> {
        let mut ids = self.commanders.get();
        let before = ids.len();
        ids.retain(|id| *id != user_id);
        if ids.len() == before {
            return Ok(false);
        }

        self.commanders.set(ids).await?;
        info!(user_id, "commander removed");
        Ok(true)
    }
}

impl std::fmt::Debug for Documents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Documents")
            .field("patterns", &self.patterns)
            .field("emojis", &self.emojis)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> Arc<ReactionDirectory> {
        Arc::new(ReactionDirectory::from_emojis(vec![
            Emoji::new("fire", "🔥"),
            Emoji::new("eyes", "👀"),
            Emoji::new("cool", "🆒"),
        ]))
    }

    fn open_in(dir: &tempfile::TempDir, directory: Arc<ReactionDirectory>) -> Documents {
        Documents::open(dir.path(), &[1], directory).unwrap()
    }

    #[test]
    fn open_writes_defaults_and_owner() {
        let dir = tempfile::tempdir().unwrap();

        let documents = open_in(&dir, directory());

        assert_eq!(documents.commanders(), vec![1]);
        assert_eq!(documents.pattern_sources(), vec!["Kat"]);
        assert_eq!(documents.pattern_cache().len(), 1);
        assert!(documents.emoji_cache().is_empty());
        assert!(dir.path().join(BLACKLIST_FILE).exists());
    }

    #[test]
    fn open_fails_on_stored_malformed_pattern() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TRIGGERS_FILE), r#"["abc", "(bad"]"#).unwrap();

        assert!(Documents::open(dir.path(), &[], directory()).is_err());
    }

    #[tokio::test]
    async fn add_pattern_rejects_malformed_and_keeps_store() {
        let dir = tempfile::tempdir().unwrap();
        let documents = open_in(&dir, directory());
        assert!(documents.add_pattern("abc").await.unwrap());

        let err = documents.add_pattern("(bad").await.unwrap_err();

        assert!(matches!(err, CommandError::Compilation { .. }));
        assert_eq!(documents.pattern_sources(), vec!["Kat", "abc"]);
        assert_eq!(documents.pattern_cache().len(), 2);
    }

    #[tokio::test]
    async fn pattern_add_and_remove_rebuild_cache() {
        let dir = tempfile::tempdir().unwrap();
        let documents = open_in(&dir, directory());

        assert!(documents.add_pattern(r"meow+").await.unwrap());
        assert!(!documents.add_pattern(r"meow+").await.unwrap());
        assert!(documents.pattern_cache().with(|p| p.iter().any(|t| t.matches("meowww"))));

        assert!(documents.remove_pattern("Kat").await.unwrap());
        assert!(!documents.remove_pattern("Kat").await.unwrap());

        let sources: Vec<String> = documents.pattern_cache().current().iter().map(|t| t.source().to_string()).collect();
        assert_eq!(sources, vec!["meow+"]);
    }

    #[tokio::test]
    async fn set_pattern_list_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let documents = open_in(&dir, directory());

        let result = documents
            .set_pattern_list(vec!["ok".to_string(), "[nope".to_string()])
            .await;
        assert!(result.is_err());
        assert_eq!(documents.pattern_sources(), vec!["Kat"]);

        assert_eq!(documents.set_pattern_list(vec!["a".to_string(), "b".to_string()]).await.unwrap(), 2);
        assert_eq!(documents.recompile_patterns().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn emoji_tokens_resolve_through_directory() {
        let dir = tempfile::tempdir().unwrap();
        let documents = open_in(&dir, directory());

        assert!(documents.add_emoji("fire").await.unwrap());
        assert!(documents.add_emoji("👀").await.unwrap());
        assert!(!documents.add_emoji("🔥").await.unwrap());
        assert!(matches!(
            documents.add_emoji("unicorn").await.unwrap_err(),
            CommandError::UnknownEmoji(_)
        ));

        assert_eq!(documents.emoji_tokens(), vec!["🔥", "👀"]);
        let names: Vec<String> = documents.emoji_cache().current().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["fire", "eyes"]);

        assert!(documents.remove_emoji("fire").await.unwrap());
        assert_eq!(documents.emoji_tokens(), vec!["👀"]);
        assert_eq!(documents.emoji_cache().len(), 1);
    }

    #[tokio::test]
    async fn stale_emoji_tokens_are_dropped_from_cache_only() {
        let dir = tempfile::tempdir().unwrap();
        let directory = directory();
        let documents = open_in(&dir, directory.clone());
        documents.set_emoji_list(&[Emoji::new("fire", "🔥"), Emoji::new("cool", "🆒")]).await.unwrap();

        directory.replace(vec![Emoji::new("cool", "🆒")]);
        assert_eq!(documents.reload_emoji_cache().await.unwrap(), 1);

        assert_eq!(documents.emoji_tokens(), vec!["🔥", "🆒"]);
        assert_eq!(documents.emoji_cache().current(), vec![Emoji::new("cool", "🆒")]);

        // Stale tokens can still be removed by their stored form.
        assert!(documents.remove_emoji("🔥").await.unwrap());
    }

    #[test]
    fn resolve_emojis_rejects_unknown_token() {
        let dir = tempfile::tempdir().unwrap();
        let documents = open_in(&dir, directory());

        let resolved = documents.resolve_emojis(&["eyes", "🔥"]).unwrap();
        assert_eq!(resolved, vec![Emoji::new("eyes", "👀"), Emoji::new("fire", "🔥")]);

        let err = documents.resolve_emojis(&["eyes", "unicorn"]).unwrap_err();
        assert!(matches!(err, CommandError::UnknownEmoji(token) if token == "unicorn"));
    }

    #[tokio::test]
    async fn blacklist_entries_round_trip_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let documents = open_in(&dir, directory());

        assert!(documents.add_blacklist_entry(-100, 7).await.unwrap());
        assert!(!documents.add_blacklist_entry(-100, 7).await.unwrap());
        assert!(documents.is_blacklisted(-100, 7));

        assert!(documents.remove_blacklist_entry(-100, 7).await.unwrap());
        assert!(!documents.remove_blacklist_entry(-100, 7).await.unwrap());
        assert!(!documents.is_blacklisted(-100, 7));

        let raw = fs::read_to_string(dir.path().join(BLACKLIST_FILE)).unwrap();
        assert_eq!(raw, "{}");
    }

    #[tokio::test]
    async fn commanders_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let documents = open_in(&dir, directory());

        assert!(documents.add_commander(5).await.unwrap());
        assert!(!documents.add_commander(5).await.unwrap());
        assert!(documents.remove_commander(1).await.unwrap());
        drop(documents);

        // The owner comes back on restart.
        let reopened = open_in(&dir, directory());
        assert_eq!(reopened.commanders(), vec![5, 1]);
        assert!(reopened.is_commander(5));
    }
}
