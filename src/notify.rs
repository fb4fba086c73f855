//! Pushover notifications for sync failures. Delivery problems are logged
//! and swallowed by callers; a broken notifier must never break a sync.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{Config, PushoverConfig};

const PUSHOVER_ENDPOINT: &str = "https://api.pushover.net/1/messages.json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Pushover caps message bodies; longer texts are truncated before sending.
const MAX_MESSAGE_LENGTH: usize = 500;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notification rejected with status {0}")]
    Rejected(u16),
}

pub struct PushoverNotifier {
    client: reqwest::Client,
    config: PushoverConfig,
}

impl PushoverNotifier {
    /// Builds a notifier when Pushover is enabled and fully configured,
    /// `None` otherwise.
    pub fn from_config(config: &Config) -> Option<Self> {
        let pushover = config.pushover_config()?;
        let client = match reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build() {
            Ok(client) => client,
            Err(e) => {
                warn!("Failed to build notification client: {e}");
                return None;
            }
        };
        Some(Self {
            client,
            config: pushover,
        })
    }

    pub async fn send(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let mut form = vec![
            ("token", self.config.api_token.as_str()),
            ("user", self.config.user_key.as_str()),
            ("title", title),
            ("message", message),
        ];
        if let Some(device) = &self.config.device {
            form.push(("device", device.as_str()));
        }

        let response = self
            .client
            .post(PUSHOVER_ENDPOINT)
            .form(&form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }
        debug!("Notification delivered: {title}");
        Ok(())
    }
}

/// Trims an error message to the notification size limit.
pub fn sanitize_error(message: &str) -> String {
    if message.chars().count() <= MAX_MESSAGE_LENGTH {
        return message.to_string();
    }
    let truncated: String = message.chars().take(MAX_MESSAGE_LENGTH - 3).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_messages_pass_through() {
        assert_eq!(sanitize_error("sync failed"), "sync failed");
    }

    #[test]
    fn long_messages_are_truncated_with_ellipsis() {
        let long = "x".repeat(800);
        let sanitized = sanitize_error(&long);
        assert_eq!(sanitized.chars().count(), MAX_MESSAGE_LENGTH);
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn boundary_length_is_untouched() {
        let exact = "y".repeat(MAX_MESSAGE_LENGTH);
        assert_eq!(sanitize_error(&exact), exact);
    }
}
