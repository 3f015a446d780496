//! Configuration module for Kat.
//!
//! Loads configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::reacting::ReactingConfig;

/// Bot running mode
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BotMode {
    #[default]
    Polling,
    Webhook,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub bot_token: String,
    pub bot_mode: BotMode,
    pub webhook_url: Option<String>,
    pub webhook_port: u16,
    pub webhook_secret: Option<String>,

    /// Name the bot answers to in talk requests (`<name>: text`).
    pub bot_name: String,

    /// Owner user IDs (comma-separated).
    /// Owners are always added to the commander list on startup.
    pub owner_ids: Vec<u64>,

    /// Directory holding the JSON documents.
    pub data_dir: PathBuf,

    /// Upper bound of the blocking pool used for file I/O.
    pub io_workers: usize,

    pub reacting: ReactingConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if `BOT_TOKEN` is not set, or if webhook mode is selected
    /// without `WEBHOOK_URL`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let bot_mode = match env::var("BOT_MODE")
            .unwrap_or_else(|_| "polling".to_string())
            .to_lowercase()
            .as_str()
        {
            "webhook" => BotMode::Webhook,
            _ => BotMode::Polling,
        };

        let webhook_url = env::var("WEBHOOK_URL").ok();

        // Validate webhook URL is set if mode is webhook
        if bot_mode == BotMode::Webhook && webhook_url.is_none() {
            panic!("WEBHOOK_URL must be set when BOT_MODE is webhook");
        }

        let owner_ids = env::var("OWNER_IDS")
            .or_else(|_| env::var("OWNER_ID"))
            .map(|raw| parse_ids(&raw))
            .unwrap_or_default();

        let defaults = ReactingConfig::default();
        let reacting = ReactingConfig {
            chance: parse_or("REACT_CHANCE", defaults.chance),
            max_delay: Duration::from_secs(parse_or("REACT_MAX_DELAY_SECS", defaults.max_delay.as_secs())),
            cooldown: Duration::from_secs(parse_or("REACT_COOLDOWN_SECS", defaults.cooldown.as_secs())),
        };

        Self {
            bot_token: env::var("BOT_TOKEN").expect("BOT_TOKEN must be set"),
            bot_mode,
            webhook_url,
            webhook_port: parse_or("WEBHOOK_PORT", 8443),
            webhook_secret: env::var("WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()),
            bot_name: env::var("BOT_NAME")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "Kat".to_string()),
            owner_ids,
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            io_workers: parse_or("IO_WORKERS", 4_usize).max(1),
            reacting,
        }
    }
}

/// Parse a comma-separated list of user IDs, skipping anything malformed.
fn parse_ids(raw: &str) -> Vec<u64> {
    raw.split(',')
        .filter_map(|s| s.trim().parse::<u64>().ok())
        .collect()
}

/// Read `key` and parse it, falling back to `default` when unset or invalid.
fn parse_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    parse_value(key, env::var(key).ok().as_deref(), default)
}

fn parse_value<T: FromStr + Copy>(key: &str, raw: Option<&str>, default: T) -> T {
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "invalid value, using default");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ids_skips_garbage() {
        assert_eq!(parse_ids("1, 2,x,,3 "), vec![1, 2, 3]);
        assert!(parse_ids("").is_empty());
    }

    #[test]
    fn parse_value_falls_back_on_invalid_values() {
        assert_eq!(parse_value("REACT_COOLDOWN_SECS", Some(" 12 "), 1_u64), 12);
        assert_eq!(parse_value("REACT_COOLDOWN_SECS", Some("twelve"), 1_u64), 1);
        assert_eq!(parse_value("REACT_CHANCE", None, 0.5_f64), 0.5);
    }

    #[test]
    fn parse_or_uses_default_when_unset() {
        assert_eq!(parse_or("KAT_UNSET_IN_TESTS", 8443_u16), 8443);
    }
}
