//! Decides whether an inbound message gets a delayed reaction.

use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use super::Bucket;
use crate::cache::DerivedCache;
use crate::documents::{Blacklist, Documents, Emoji, Trigger};
use crate::store::JsonStore;

/// Tunables of the trigger engine.
#[derive(Debug, Clone)]
pub struct ReactingConfig {
    /// Probability that a match actually produces a reaction.
    pub chance: f64,
    /// Upper bound of the random delay before reacting.
    pub max_delay: Duration,
    /// How long the engine stays quiet after scheduling a reaction.
    pub cooldown: Duration,
}

impl Default for ReactingConfig {
    fn default() -> Self {
        Self {
            chance: 0.5,
            max_delay: Duration::from_secs(30),
            cooldown: Duration::from_secs(5 * 60),
        }
    }
}

/// What the engine needs to know about an inbound message.
pub trait InboundMessage {
    fn body(&self) -> &str;

    fn author_is_bot(&self) -> bool;

    /// `None` for one-to-one chats.
    fn guild_id(&self) -> Option<i64>;

    fn channel_id(&self) -> i64;

    fn author_id(&self) -> u64;

    /// Future that places `emoji` on this message.
    ///
    /// It is awaited after the handler has returned, so it cannot borrow
    /// the message.
    fn react(&self, emoji: &Emoji) -> BoxFuture<'static, anyhow::Result<()>>;
}

/// Outcome of [`TriggerEngine::on_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// One-to-one chat.
    Private,
    FromBot,
    /// A cool-down period is running.
    CoolingDown,
    NoMatch,
    Blacklisted,
    /// Matched, but there is nothing to react with.
    NoEmoji,
    /// Matched, but the dice said no.
    Skipped,
    Scheduled { emoji: Emoji, delay: Duration },
}

/// Matches messages against the trigger cache and schedules reactions.
pub struct TriggerEngine {
    patterns: DerivedCache<Trigger>,
    emojis: DerivedCache<Emoji>,
    blacklist: JsonStore<Blacklist>,
    bucket: Bucket,
    config: ReactingConfig,
    rng: Mutex<StdRng>,
}

impl TriggerEngine {
    pub fn new(documents: &Documents, config: ReactingConfig) -> Self {
        Self {
            patterns: documents.pattern_cache(),
            emojis: documents.emoji_cache(),
            blacklist: documents.blacklist_store(),
            bucket: Bucket::new(),
            config,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Replace the random source with a seeded one.
    #[cfg(test)]
    fn seeded(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    #[cfg(test)]
    pub fn bucket(&self) -> &Bucket {
        &self.bucket
    }

    /// Evaluate one message.
    ///
    /// Returns without waiting: the reaction itself and the end of the
    /// cool-down run as separate tasks. Must be called from inside the
    /// runtime.
    pub fn on_message<M: InboundMessage + ?Sized>(&self, message: &M) -> Decision {
        let Some(guild_id) = message.guild_id() else {
            return Decision::Private;
        };
        if message.author_is_bot() {
            return Decision::FromBot;
        }
        if self.bucket.is_engaged() {
            return Decision::CoolingDown;
        }

        let body = message.body();
        if !self.patterns.with(|patterns| patterns.iter().any(|p| p.matches(body))) {
            return Decision::NoMatch;
        }

        let channel_id = message.channel_id();
        if self.blacklist.get().contains(guild_id, channel_id) {
            info!(guild_id, channel_id, "not reacting, blacklisted channel");
            return Decision::Blacklisted;
        }

        let emojis = self.emojis.current();
        if emojis.is_empty() {
            return Decision::NoEmoji;
        }

        let (emoji, delay) = {
            let mut rng = self.rng.lock();
            if rng.r#gen::<f64>() > self.config.chance {
                return Decision::Skipped;
            }
            let Some(emoji) = emojis.choose(&mut *rng).cloned() else {
                return Decision::NoEmoji;
            };
            let delay = Duration::from_secs(rng.gen_range(0..=self.config.max_delay.as_secs()));
            (emoji, delay)
        };

        let reaction = message.react(&emoji);
        let emoji_display = emoji.display.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = reaction.await {
                warn!(emoji = %emoji_display, error = %e, "failed to add reaction");
            }
        });
        self.bucket.engage(self.config.cooldown);

        debug!(
            guild_id,
            channel_id,
            author_id = message.author_id(),
            emoji = %emoji,
            delay_secs = delay.as_secs(),
            "reaction scheduled"
        );
        Decision::Scheduled { emoji, delay }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::FutureExt;

    use super::*;
    use crate::documents::ReactionDirectory;

    const GUILD: i64 = -1001;
    const CHANNEL: i64 = 42;

    #[derive(Clone)]
    struct FakeMessage {
        body: String,
        bot: bool,
        guild: Option<i64>,
        channel: i64,
        reactions: Arc<Mutex<Vec<String>>>,
    }

    impl FakeMessage {
        fn in_group(body: &str) -> Self {
            Self {
                body: body.to_string(),
                bot: false,
                guild: Some(GUILD),
                channel: CHANNEL,
                reactions: Arc::default(),
            }
        }

        fn reactions(&self) -> Vec<String> {
            self.reactions.lock().clone()
        }
    }

    impl InboundMessage for FakeMessage {
        fn body(&self) -> &str {
            &self.body
        }

        fn author_is_bot(&self) -> bool {
            self.bot
        }

        fn guild_id(&self) -> Option<i64> {
            self.guild
        }

        fn channel_id(&self) -> i64 {
            self.channel
        }

        fn author_id(&self) -> u64 {
            7
        }

        fn react(&self, emoji: &Emoji) -> BoxFuture<'static, anyhow::Result<()>> {
            let reactions = Arc::clone(&self.reactions);
            let display = emoji.display.clone();
            async move {
                reactions.lock().push(display);
                Ok(())
            }
            .boxed()
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        documents: Documents,
    }

    async fn fixture(emojis: &[Emoji]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let directory = Arc::new(ReactionDirectory::from_emojis(vec![
            Emoji::new("fire", "🔥"),
            Emoji::new("eyes", "👀"),
        ]));
        let documents = Documents::open(dir.path(), &[], directory).unwrap();
        documents.set_pattern_list(vec!["kat".to_string(), "meow".to_string()]).await.unwrap();
        documents.set_emoji_list(emojis).await.unwrap();
        Fixture { _dir: dir, documents }
    }

    fn always() -> ReactingConfig {
        ReactingConfig {
            chance: 1.0,
            ..ReactingConfig::default()
        }
    }

    fn fire() -> Emoji {
        Emoji::new("fire", "🔥")
    }

    #[tokio::test(start_paused = true)]
    async fn ignores_private_and_bot_messages() {
        let fx = fixture(&[fire()]).await;
        let engine = TriggerEngine::new(&fx.documents, always()).seeded(1);

        let mut private = FakeMessage::in_group("kat");
        private.guild = None;
        assert_eq!(engine.on_message(&private), Decision::Private);

        let mut bot = FakeMessage::in_group("kat");
        bot.bot = true;
        assert_eq!(engine.on_message(&bot), Decision::FromBot);

        assert!(!engine.bucket().is_engaged());
    }

    #[tokio::test(start_paused = true)]
    async fn unmatched_message_is_ignored() {
        let fx = fixture(&[fire()]).await;
        let engine = TriggerEngine::new(&fx.documents, always()).seeded(1);

        assert_eq!(engine.on_message(&FakeMessage::in_group("hello kat")), Decision::NoMatch);
        assert!(!engine.bucket().is_engaged());
    }

    #[tokio::test(start_paused = true)]
    async fn match_schedules_one_reaction_and_engages_bucket() {
        let fx = fixture(&[fire()]).await;
        let engine = TriggerEngine::new(&fx.documents, always()).seeded(1);
        let message = FakeMessage::in_group("Meow meow");

        let Decision::Scheduled { emoji, delay } = engine.on_message(&message) else {
            panic!("expected a scheduled reaction");
        };
        assert_eq!(emoji, fire());
        assert!(delay <= Duration::from_secs(30));
        assert_eq!(engine.bucket().count(), 1);

        let second = FakeMessage::in_group("kat!");
        assert_eq!(engine.on_message(&second), Decision::CoolingDown);
        assert_eq!(engine.bucket().count(), 1);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(message.reactions(), vec!["🔥"]);
        assert!(second.reactions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reaction_waits_for_its_delay() {
        let fx = fixture(&[fire()]).await;
        let config = ReactingConfig {
            chance: 1.0,
            max_delay: Duration::from_secs(30),
            cooldown: Duration::from_secs(60),
        };
        let engine = TriggerEngine::new(&fx.documents, config).seeded(3);
        let message = FakeMessage::in_group("kat");

        let Decision::Scheduled { delay, .. } = engine.on_message(&message) else {
            panic!("expected a scheduled reaction");
        };
        if delay > Duration::ZERO {
            tokio::time::sleep(delay - Duration::from_millis(1)).await;
            assert!(message.reactions().is_empty());
        }

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(message.reactions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_expires() {
        let fx = fixture(&[fire()]).await;
        let engine = TriggerEngine::new(&fx.documents, always()).seeded(5);

        assert!(matches!(engine.on_message(&FakeMessage::in_group("kat")), Decision::Scheduled { .. }));

        tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;
        assert!(!engine.bucket().is_engaged());
        assert!(matches!(engine.on_message(&FakeMessage::in_group("kat")), Decision::Scheduled { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn blacklisted_channel_is_skipped() {
        let fx = fixture(&[fire()]).await;
        fx.documents.add_blacklist_entry(GUILD, CHANNEL).await.unwrap();
        let engine = TriggerEngine::new(&fx.documents, always()).seeded(1);

        assert_eq!(engine.on_message(&FakeMessage::in_group("kat")), Decision::Blacklisted);

        let mut elsewhere = FakeMessage::in_group("kat");
        elsewhere.channel = CHANNEL + 1;
        assert!(matches!(engine.on_message(&elsewhere), Decision::Scheduled { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn removing_last_blacklisted_channel_resumes_reactions() {
        let fx = fixture(&[fire()]).await;
        fx.documents.add_blacklist_entry(GUILD, CHANNEL).await.unwrap();
        fx.documents.remove_blacklist_entry(GUILD, CHANNEL).await.unwrap();
        let engine = TriggerEngine::new(&fx.documents, always()).seeded(1);

        assert!(fx.documents.blacklist_store().get().is_empty());
        assert!(matches!(engine.on_message(&FakeMessage::in_group("kat")), Decision::Scheduled { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn no_emoji_means_no_reaction() {
        let fx = fixture(&[]).await;
        let engine = TriggerEngine::new(&fx.documents, always()).seeded(1);

        assert_eq!(engine.on_message(&FakeMessage::in_group("kat")), Decision::NoEmoji);
        assert!(!engine.bucket().is_engaged());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_chance_never_reacts() {
        let fx = fixture(&[fire()]).await;
        let config = ReactingConfig {
            chance: 0.0,
            ..ReactingConfig::default()
        };
        let engine = TriggerEngine::new(&fx.documents, config).seeded(9);

        for _ in 0..20 {
            assert_eq!(engine.on_message(&FakeMessage::in_group("kat")), Decision::Skipped);
        }
        assert!(!engine.bucket().is_engaged());
    }

    #[tokio::test(start_paused = true)]
    async fn picks_from_every_cached_emoji() {
        let fx = fixture(&[fire(), Emoji::new("eyes", "👀")]).await;
        let config = ReactingConfig {
            chance: 1.0,
            max_delay: Duration::ZERO,
            cooldown: Duration::ZERO,
        };
        let engine = TriggerEngine::new(&fx.documents, config).seeded(11);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            if let Decision::Scheduled { emoji, .. } = engine.on_message(&FakeMessage::in_group("kat")) {
                seen.insert(emoji.name);
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        assert_eq!(seen.len(), 2);
    }
}
