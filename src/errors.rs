use thiserror::Error;

use crate::slack::webhook::redact_url;

/// Every failure surfaced by the Slack clients.
///
/// Local checks (`Configuration`, `InvalidInput`) fail before any request is
/// sent. `Transport` is kept apart from `Api`/`Webhook` rejections so callers
/// can retry network blips without retrying requests Slack refused.
#[derive(Debug, Error)]
pub enum SlackError {
    #[error("Slack client is misconfigured: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Slack API {endpoint} failed (HTTP {status}): {error}")]
    Api {
        endpoint: String,
        status: u16,
        error: String,
    },

    #[error("Slack webhook {webhook} returned HTTP {status}: {body}")]
    Webhook {
        webhook: String,
        status: u16,
        body: String,
    },

    #[error("Failed to send HTTP request to {target}: {detail}")]
    Transport { target: String, detail: String },

    #[error("Failed to parse Slack response: {0}")]
    Parse(String),
}

impl SlackError {
    /// Whether a retry could plausibly succeed: network failures, rate limits
    /// and 5xx responses. The clients never retry on their own.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Api { status, error, .. } => {
                *status == 429
                    || *status >= 500
                    || error == "ratelimited"
                    || error == "rate_limited"
            }
            Self::Webhook { status, .. } => *status == 429 || *status >= 500,
            Self::Configuration(_) | Self::InvalidInput(_) | Self::Parse(_) => false,
        }
    }

    /// HTTP status attached to an API or webhook rejection.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::Webhook { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SlackError {
    fn from(error: reqwest::Error) -> Self {
        let target = error
            .url()
            .map_or_else(|| "unknown".to_string(), |u| redact_url(u.as_str()));
        let detail = if error.is_timeout() {
            "request timed out".to_string()
        } else {
            // reqwest embeds the full URL in its message; webhook URLs carry a secret
            error.without_url().to_string()
        };
        SlackError::Transport { target, detail }
    }
}
