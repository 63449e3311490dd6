//! Slack workflow webhook URLs.
//!
//! Workflow triggers look like
//! `https://hooks.slack.com/triggers/XXXXXXXXX/0000000000000/HHHHHHHH`:
//! alphanumeric team id, numeric trigger id, hex secret. The secret segment
//! never appears in logs or errors.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use url::Url;

use crate::core::models::RequestBody;
use crate::errors::SlackError;

static WEBHOOK_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^https://hooks\.slack\.com/triggers/[A-Za-z\d]+/\d+/[A-Fa-f\d]+$").ok()
});

/// How webhook fields are encoded on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WebhookFormat {
    /// `application/x-www-form-urlencoded`
    #[default]
    Form,
    /// `application/json` object of string fields
    Json,
}

impl WebhookFormat {
    #[must_use]
    pub fn encode(self, fields: &[(&str, &str)]) -> RequestBody {
        match self {
            Self::Form => RequestBody::Form(
                fields
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
            ),
            Self::Json => {
                let object: Map<String, Value> = fields
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), Value::String((*v).to_string())))
                    .collect();
                RequestBody::Json(Value::Object(object))
            }
        }
    }

    /// Parse `form` or `json` (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "form" => Some(Self::Form),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Whether `url` has the shape of a Slack workflow trigger URL.
#[must_use]
pub fn is_valid_webhook_url(url: &str) -> bool {
    WEBHOOK_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(url))
}

/// Replace the secret trailing segment of a trigger URL with `***`.
/// Other URLs come back without query string or fragment.
#[must_use]
pub fn redact_url(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw) else {
        return "<invalid url>".to_string();
    };
    parsed.set_query(None);
    parsed.set_fragment(None);

    let segments: Vec<String> = parsed
        .path_segments()
        .map(|s| s.map(str::to_string).collect())
        .unwrap_or_default();
    if segments.first().map(String::as_str) == Some("triggers") && segments.len() >= 4 {
        let kept = segments[..segments.len() - 1].join("/");
        parsed.set_path(&format!("/{kept}/***"));
    }
    parsed.to_string()
}

/// A validated workflow trigger URL.
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookUrl(String);

impl WebhookUrl {
    /// # Errors
    ///
    /// Returns `SlackError::Configuration` naming `field` when `url` is not a
    /// Slack workflow trigger URL.
    pub fn parse(field: &str, url: &str) -> Result<Self, SlackError> {
        let url = url.trim();
        if is_valid_webhook_url(url) {
            Ok(Self(url.to_string()))
        } else {
            Err(SlackError::Configuration(format!(
                "{field} is not a valid Slack workflow webhook URL: {}",
                redact_url(url)
            )))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn redacted(&self) -> String {
        redact_url(&self.0)
    }
}

impl fmt::Debug for WebhookUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WebhookUrl").field(&self.redacted()).finish()
    }
}
