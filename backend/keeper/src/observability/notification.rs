//! Notification targets, grounded in `original_source/Notifcation.py`'s
//! `TelegramNotifier`/`DiscordNotifier`. Each target posts a plain-text
//! message to its webhook and swallows delivery failures: a notification
//! failing must never fail the liquidation it's reporting on.

use std::str::FromStr;

use tracing::warn;

pub trait NotificationTarget: Send + Sync {
    fn notify(&self, message: &str);
}

pub struct TelegramTarget {
    bot_id: String,
    chat_id: String,
    client: reqwest::blocking::Client,
}

impl NotificationTarget for TelegramTarget {
    fn notify(&self, message: &str) {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_id);
        let result = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "disable_notification": true,
                "chat_id": self.chat_id,
                "text": message,
            }))
            .send();
        if let Err(e) = result {
            warn!(error = %e, "telegram notification failed");
        }
    }
}

pub struct DiscordTarget {
    webhook_url: String,
    client: reqwest::blocking::Client,
}

impl NotificationTarget for DiscordTarget {
    fn notify(&self, message: &str) {
        let result = self
            .client
            .post(&self.webhook_url)
            .json(&serde_json::json!({ "content": message }))
            .send();
        if let Err(e) = result {
            warn!(error = %e, "discord notification failed");
        }
    }
}

/// Parses the `--notify` CLI grammar: `telegram:<chat_id>@<bot_id>` or
/// `discord:<webhook_url>` (spec.md §6).
pub fn parse_notification_target(spec: &str) -> Result<Box<dyn NotificationTarget>, String> {
    let mut parts = spec.splitn(2, ':');
    let kind = parts.next().unwrap_or_default();
    let rest = parts.next().ok_or_else(|| format!("malformed notification target '{spec}'"))?;

    match kind {
        "telegram" => {
            let (chat_id, bot_id) = rest
                .split_once('@')
                .ok_or_else(|| format!("telegram target '{spec}' expected <chat_id>@<bot_id>"))?;
            Ok(Box::new(TelegramTarget {
                bot_id: bot_id.to_string(),
                chat_id: chat_id.to_string(),
                client: reqwest::blocking::Client::new(),
            }))
        }
        "discord" => Ok(Box::new(DiscordTarget {
            webhook_url: rest.to_string(),
            client: reqwest::blocking::Client::new(),
        })),
        other => Err(format!("unknown notification target kind '{other}'")),
    }
}

/// Convenience wrapper so `--notify telegram:...` round-trips through
/// `str::parse` as well as the explicit constructor above.
pub struct ParsedTarget(pub Box<dyn NotificationTarget>);

impl FromStr for ParsedTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_notification_target(s).map(ParsedTarget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_discord_target() {
        let target = parse_notification_target("discord:https://discord.com/api/webhooks/x");
        assert!(target.is_ok());
    }

    #[test]
    fn parses_telegram_target() {
        let target = parse_notification_target("telegram:456@abc123");
        assert!(target.is_ok());
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(parse_notification_target("slack:hook").is_err());
    }

    #[test]
    fn rejects_missing_rest() {
        assert!(parse_notification_target("telegram").is_err());
    }
}
