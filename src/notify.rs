//! Outbound session summaries to Discord and Telegram
//!
//! Delivery is best effort. A failed post is logged and never interrupts the
//! export that triggered it.

use crate::config::NotificationConfig;
use log::{info, warn};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{channel} returned status {status}")]
    Status { channel: &'static str, status: u16 },
}

/// A single delivery target with its JSON payload
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub channel: &'static str,
    pub url: String,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct Notifier {
    discord_webhook: Option<String>,
    telegram: Option<(String, String)>,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl Notifier {
    pub fn new(
        discord_webhook: Option<String>,
        telegram_token: Option<String>,
        telegram_chat_id: Option<String>,
    ) -> Self {
        let telegram = match (telegram_token, telegram_chat_id) {
            (Some(token), Some(chat)) => non_empty(&token).zip(non_empty(&chat)),
            _ => None,
        };
        Self {
            discord_webhook: discord_webhook.as_deref().and_then(non_empty),
            telegram,
        }
    }

    /// Channels that are switched off in the config are left out
    pub fn from_config(config: &NotificationConfig) -> Self {
        let discord = config
            .use_discord
            .then(|| config.discord_webhook.clone());
        let (token, chat) = if config.use_telegram {
            (
                Some(config.telegram_token.clone()),
                Some(config.telegram_chat_id.clone()),
            )
        } else {
            (None, None)
        };
        Self::new(discord, token, chat)
    }

    pub fn is_empty(&self) -> bool {
        self.discord_webhook.is_none() && self.telegram.is_none()
    }

    pub fn deliveries(&self, summary: &str) -> Vec<Delivery> {
        let mut out = Vec::new();
        if let Some(webhook) = &self.discord_webhook {
            out.push(Delivery {
                channel: "Discord",
                url: webhook.clone(),
                body: json!({ "content": summary }),
            });
        }
        if let Some((token, chat_id)) = &self.telegram {
            out.push(Delivery {
                channel: "Telegram",
                url: format!("{}/bot{}/sendMessage", TELEGRAM_API, token),
                body: json!({ "chat_id": chat_id, "text": summary }),
            });
        }
        out
    }

    /// Post `summary` to every configured channel. Returns how many succeeded.
    pub fn post_summary(&self, summary: &str) -> usize {
        let deliveries = self.deliveries(summary);
        if deliveries.is_empty() {
            return 0;
        }

        let client = match reqwest::blocking::Client::builder()
            .timeout(NOTIFY_TIMEOUT)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                warn!("Failed to create HTTP client: {}", e);
                return 0;
            }
        };

        let mut delivered = 0;
        for delivery in deliveries {
            match send(&client, &delivery) {
                Ok(()) => {
                    info!("{} notification sent", delivery.channel);
                    delivered += 1;
                }
                Err(e) => warn!("{} notification failed: {}", delivery.channel, e),
            }
        }
        delivered
    }
}

fn send(client: &reqwest::blocking::Client, delivery: &Delivery) -> Result<(), NotifyError> {
    let response = client.post(&delivery.url).json(&delivery.body).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(NotifyError::Status {
            channel: delivery.channel,
            status: status.as_u16(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_notifier_sends_nothing() {
        let notifier = Notifier::default();
        assert!(notifier.is_empty());
        assert!(notifier.deliveries("hi").is_empty());
        assert_eq!(notifier.post_summary("hi"), 0);
    }

    #[test]
    fn discord_payload_uses_content_field() {
        let notifier = Notifier::new(Some("https://discord.test/hook".into()), None, None);
        let deliveries = notifier.deliveries("KDyn s: events=1");
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].url, "https://discord.test/hook");
        assert_eq!(deliveries[0].body, json!({ "content": "KDyn s: events=1" }));
    }

    #[test]
    fn telegram_builds_send_message_url() {
        let notifier = Notifier::new(None, Some("123:abc".into()), Some("42".into()));
        let deliveries = notifier.deliveries("hello");
        assert_eq!(deliveries.len(), 1);
        assert_eq!(
            deliveries[0].url,
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
        assert_eq!(deliveries[0].body["chat_id"], "42");
        assert_eq!(deliveries[0].body["text"], "hello");
    }

    #[test]
    fn telegram_needs_token_and_chat() {
        let notifier = Notifier::new(None, Some("123:abc".into()), Some("  ".into()));
        assert!(notifier.is_empty());
    }

    #[test]
    fn disabled_channels_are_skipped() {
        let config = NotificationConfig {
            use_discord: false,
            discord_webhook: "https://discord.test/hook".into(),
            use_telegram: true,
            telegram_token: "t".into(),
            telegram_chat_id: "c".into(),
        };
        let deliveries = Notifier::from_config(&config).deliveries("x");
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].channel, "Telegram");
    }

    #[test]
    fn unreachable_endpoint_is_logged_not_fatal() {
        let notifier = Notifier::new(Some("http://127.0.0.1:9/".into()), None, None);
        assert_eq!(notifier.post_summary("x"), 0);
    }
}
