//! Update sources: long polling, or a Telegram webhook served by axum.

use std::net::SocketAddr;

use anyhow::Context;
use teloxide::dispatching::DefaultKey;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use tracing::info;
use url::Url;

use super::dispatcher::ThrottledBot;
use crate::config::{BotMode, Config};

/// Feed `dispatcher` from the configured update source until it stops
/// (Ctrl+C or /stop).
///
/// In webhook mode the webhook is registered first and deleted again on
/// shutdown.
pub async fn run(
    config: &Config,
    mut dispatcher: Dispatcher<ThrottledBot, anyhow::Error, DefaultKey>,
    bot: ThrottledBot,
) -> anyhow::Result<()> {
    match config.bot_mode {
        BotMode::Polling => {
            info!("Starting bot in polling mode...");
            dispatcher.dispatch().await;
        }
        BotMode::Webhook => {
            let options = webhook_options(config)?;
            info!("Starting bot in webhook mode on port {}...", config.webhook_port);

            // Registering the webhook bypasses the Throttle adaptor.
            let listener = webhooks::axum(bot.inner().clone(), options)
                .await
                .context("Failed to set up webhook")?;

            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("Error from update listener"),
                )
                .await;
        }
    }

    info!("Dispatcher stopped; pending reactions are abandoned");
    Ok(())
}

/// Webhook settings from config: public URL, local port, optional secret.
fn webhook_options(config: &Config) -> anyhow::Result<Options> {
    let raw = config
        .webhook_url
        .as_deref()
        .context("WEBHOOK_URL must be set when using webhook mode")?;
    let url = Url::parse(raw).with_context(|| format!("Invalid WEBHOOK_URL: {raw}"))?;
    let address = SocketAddr::from(([0, 0, 0, 0], config.webhook_port));

    info!("Webhook URL: {}, listening on {}", url, address);

    let options = Options::new(address, url);
    Ok(match &config.webhook_secret {
        Some(secret) => options.secret_token(secret.clone()),
        None => options,
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::reacting::ReactingConfig;

    fn config(webhook_url: Option<&str>, webhook_secret: Option<&str>) -> Config {
        Config {
            bot_token: "token".to_string(),
            bot_mode: BotMode::Webhook,
            webhook_url: webhook_url.map(str::to_string),
            webhook_port: 8443,
            webhook_secret: webhook_secret.map(str::to_string),
            bot_name: "Kat".to_string(),
            owner_ids: Vec::new(),
            data_dir: PathBuf::from("data"),
            io_workers: 1,
            reacting: ReactingConfig::default(),
        }
    }

    #[test]
    fn webhook_options_need_a_valid_url() {
        assert!(webhook_options(&config(None, None)).is_err());
        assert!(webhook_options(&config(Some("not a url"), None)).is_err());
    }

    #[test]
    fn webhook_options_carry_address_and_secret() {
        let options = webhook_options(&config(Some("https://example.org/kat"), Some("s3cret"))).unwrap();

        assert_eq!(options.address, SocketAddr::from(([0, 0, 0, 0], 8443)));
        assert_eq!(options.url.as_str(), "https://example.org/kat");
        assert_eq!(options.secret_token.as_deref(), Some("s3cret"));
    }
}
