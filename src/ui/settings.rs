//! Editable view of the persisted settings

use crate::config::Config;
use thiserror::Error;

/// Upper bound for `max_duration_sec` (one day)
pub const MAX_DURATION_LIMIT_SEC: u64 = 86_400;
/// Upper bound for `idle_timeout_sec` (one hour)
pub const IDLE_TIMEOUT_LIMIT_SEC: u64 = 3_600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{field}: expected a whole number of seconds")]
    InvalidNumber { field: &'static str },

    #[error("{field}: must be at most {max}")]
    OutOfRange { field: &'static str, max: u64 },

    #[error("{field} is not a text field")]
    NotText { field: &'static str },
}

/// How a field is changed from the settings view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Toggle,
    Choice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    SessionName,
    MaxDuration,
    IdleTimeout,
    Theme,
    UseDiscord,
    DiscordWebhook,
    UseTelegram,
    TelegramToken,
    TelegramChatId,
}

impl SettingsField {
    pub fn all() -> &'static [SettingsField] {
        &[
            Self::SessionName,
            Self::MaxDuration,
            Self::IdleTimeout,
            Self::Theme,
            Self::UseDiscord,
            Self::DiscordWebhook,
            Self::UseTelegram,
            Self::TelegramToken,
            Self::TelegramChatId,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::SessionName => "Session name",
            Self::MaxDuration => "Max duration (sec)",
            Self::IdleTimeout => "Idle timeout (sec)",
            Self::Theme => "Theme",
            Self::UseDiscord => "Enable Discord",
            Self::DiscordWebhook => "Discord webhook",
            Self::UseTelegram => "Enable Telegram",
            Self::TelegramToken => "Telegram bot token",
            Self::TelegramChatId => "Telegram chat id",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::SessionName | Self::DiscordWebhook | Self::TelegramToken | Self::TelegramChatId => {
                FieldKind::Text
            }
            Self::MaxDuration | Self::IdleTimeout => FieldKind::Number,
            Self::UseDiscord | Self::UseTelegram => FieldKind::Toggle,
            Self::Theme => FieldKind::Choice,
        }
    }

    /// Unmasked current value, used to seed the edit buffer
    pub fn raw_value(&self, config: &Config) -> String {
        let notify = &config.notifications;
        match self {
            Self::SessionName => config.session.session_name.clone(),
            Self::MaxDuration => config.session.max_duration_sec.to_string(),
            Self::IdleTimeout => config.session.idle_timeout_sec.to_string(),
            Self::Theme => config.ui.theme.name().to_string(),
            Self::UseDiscord => on_off(notify.use_discord).to_string(),
            Self::DiscordWebhook => notify.discord_webhook.clone(),
            Self::UseTelegram => on_off(notify.use_telegram).to_string(),
            Self::TelegramToken => notify.telegram_token.clone(),
            Self::TelegramChatId => notify.telegram_chat_id.clone(),
        }
    }

    /// Value as shown in the settings list; credentials are masked
    pub fn display(&self, config: &Config) -> String {
        let raw = self.raw_value(config);
        match self {
            Self::DiscordWebhook | Self::TelegramToken => mask(&raw),
            _ if raw.is_empty() => "-".to_string(),
            _ => raw,
        }
    }

    /// Flip a toggle or advance a choice. Returns false for text fields.
    pub fn activate(&self, config: &mut Config) -> bool {
        let notify = &mut config.notifications;
        match self {
            Self::UseDiscord => notify.use_discord = !notify.use_discord,
            Self::UseTelegram => notify.use_telegram = !notify.use_telegram,
            Self::Theme => config.ui.theme = config.ui.theme.next(),
            _ => return false,
        }
        true
    }

    /// Store edited text into `config`. Nothing changes on error.
    pub fn apply(&self, config: &mut Config, input: &str) -> Result<(), SettingsError> {
        let input = input.trim();
        let notify = &mut config.notifications;
        match self {
            Self::SessionName => {
                config.session.session_name = if input.is_empty() {
                    "default".to_string()
                } else {
                    input.to_string()
                };
            }
            Self::MaxDuration => {
                config.session.max_duration_sec = self.parse_secs(input, MAX_DURATION_LIMIT_SEC)?;
            }
            Self::IdleTimeout => {
                config.session.idle_timeout_sec = self.parse_secs(input, IDLE_TIMEOUT_LIMIT_SEC)?;
            }
            Self::DiscordWebhook => notify.discord_webhook = input.to_string(),
            Self::TelegramToken => notify.telegram_token = input.to_string(),
            Self::TelegramChatId => notify.telegram_chat_id = input.to_string(),
            Self::Theme | Self::UseDiscord | Self::UseTelegram => {
                return Err(SettingsError::NotText { field: self.label() });
            }
        }
        Ok(())
    }

    fn parse_secs(&self, input: &str, max: u64) -> Result<u64, SettingsError> {
        let secs: u64 = input
            .parse()
            .map_err(|_| SettingsError::InvalidNumber { field: self.label() })?;
        if secs > max {
            return Err(SettingsError::OutOfRange {
                field: self.label(),
                max,
            });
        }
        Ok(secs)
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Keep only the last four characters of a credential
fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        return "-".to_string();
    }
    let tail: String = secret.chars().skip(count.saturating_sub(4)).collect();
    format!("****{}", tail)
}
