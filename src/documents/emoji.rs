//! Reaction emoji and the directory they are resolved against.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

/// A reaction the bot can place on a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Emoji {
    /// Short lookup name, e.g. `thumbs_up`.
    pub name: String,
    /// What is sent to the platform and stored on disk.
    pub display: String,
}

impl Emoji {
    pub fn new(name: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display: display.into(),
        }
    }

    /// Whether `token` names this emoji, by display form or by name.
    pub fn answers_to(&self, token: &str) -> bool {
        self.display == token || self.name == token
    }
}

impl fmt::Display for Emoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

/// Live set of emoji currently usable for reactions.
pub trait EmojiDirectory: Send + Sync {
    fn emojis(&self) -> Vec<Emoji>;

    /// First known emoji answering to `token`.
    fn find(&self, token: &str) -> Option<Emoji> {
        self.emojis().into_iter().find(|e| e.answers_to(token))
    }
}

/// Reactions Telegram accepts from bots via `setMessageReaction`.
static TELEGRAM_REACTIONS: Lazy<Vec<Emoji>> = Lazy::new(|| {
    [
        ("thumbs_up", "👍"),
        ("thumbs_down", "👎"),
        ("heart", "❤"),
        ("fire", "🔥"),
        ("smiling_face_with_hearts", "🥰"),
        ("clap", "👏"),
        ("grin", "😁"),
        ("thinking", "🤔"),
        ("exploding_head", "🤯"),
        ("scream", "😱"),
        ("cursing", "🤬"),
        ("cry", "😢"),
        ("tada", "🎉"),
        ("star_struck", "🤩"),
        ("pray", "🙏"),
        ("ok_hand", "👌"),
        ("dove", "🕊"),
        ("clown", "🤡"),
        ("yawn", "🥱"),
        ("heart_eyes", "😍"),
        ("whale", "🐳"),
        ("new_moon_face", "🌚"),
        ("hotdog", "🌭"),
        ("hundred", "💯"),
        ("rofl", "🤣"),
        ("zap", "⚡"),
        ("banana", "🍌"),
        ("trophy", "🏆"),
        ("broken_heart", "💔"),
        ("raised_eyebrow", "🤨"),
        ("neutral_face", "😐"),
        ("strawberry", "🍓"),
        ("champagne", "🍾"),
        ("kiss", "💋"),
        ("smiling_imp", "😈"),
        ("sleeping", "😴"),
        ("sob", "😭"),
        ("nerd", "🤓"),
        ("ghost", "👻"),
        ("eyes", "👀"),
        ("jack_o_lantern", "🎃"),
        ("see_no_evil", "🙈"),
        ("innocent", "😇"),
        ("fearful", "😨"),
        ("handshake", "🤝"),
        ("hugging", "🤗"),
        ("salute", "🫡"),
        ("santa", "🎅"),
        ("christmas_tree", "🎄"),
        ("nail_care", "💅"),
        ("zany", "🤪"),
        ("moyai", "🗿"),
        ("cool", "🆒"),
        ("cupid", "💘"),
        ("hear_no_evil", "🙉"),
        ("unicorn", "🦄"),
        ("kissing_heart", "😘"),
        ("pill", "💊"),
        ("speak_no_evil", "🙊"),
        ("sunglasses", "😎"),
        ("space_invader", "👾"),
        ("shrug", "🤷"),
        ("angry", "😡"),
    ]
    .into_iter()
    .map(|(name, display)| Emoji::new(name, display))
    .collect()
});

/// Angry face, used to turn down unauthorised requests.
pub fn angry() -> Emoji {
    Emoji::new("angry", "😡")
}

/// OK hand, used to confirm a command.
pub fn ok_hand() -> Emoji {
    Emoji::new("ok_hand", "👌")
}

/// Emoji directory whose contents can be swapped at runtime.
#[derive(Clone)]
pub struct ReactionDirectory {
    known: Arc<RwLock<Vec<Emoji>>>,
}

impl ReactionDirectory {
    /// Directory of every reaction Telegram allows.
    pub fn telegram() -> Self {
        Self::from_emojis(TELEGRAM_REACTIONS.clone())
    }

    pub fn from_emojis(emojis: Vec<Emoji>) -> Self {
        Self {
            known: Arc::new(RwLock::new(emojis)),
        }
    }

    /// Replace the known set. Callers should fire a recache afterwards.
    #[cfg(test)]
    pub fn replace(&self, emojis: Vec<Emoji>) {
        *self.known.write() = emojis;
    }
}

impl EmojiDirectory for ReactionDirectory {
    fn emojis(&self) -> Vec<Emoji> {
        self.known.read().clone()
    }

    fn find(&self, token: &str) -> Option<Emoji> {
        self.known.read().iter().find(|e| e.answers_to(token)).cloned()
    }
}

impl fmt::Debug for ReactionDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactionDirectory")
            .field("known", &self.known.read().len())
            .finish()
    }
}
