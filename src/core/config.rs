use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::SlackError;
use crate::slack::logger::ClientLogger;
use crate::slack::webhook::{WebhookFormat, redact_url};

pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP settings shared by every request a client makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Prefix for Web API method URLs.
    pub api_base_url: String,
    /// Per-request timeout. A timed-out call fails with `SlackError::Transport`.
    pub timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl HttpSettings {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, SlackError> {
        let mut settings = Self::default();
        if let Some(base) = lookup("SLACK_API_BASE_URL") {
            settings.api_base_url = base;
        }
        if let Some(secs) = lookup("SLACK_HTTP_TIMEOUT_SECS") {
            let secs = secs.trim().parse::<u64>().map_err(|e| {
                SlackError::Configuration(format!("SLACK_HTTP_TIMEOUT_SECS: {e}"))
            })?;
            settings.timeout = Duration::from_secs(secs);
        }
        Ok(settings)
    }
}

/// Credentials and options for the base Web API client.
#[derive(Clone)]
pub struct SlackClientConfig {
    /// Bot or user token sent as `Authorization: Bearer`.
    pub token: String,
    /// Where client log lines go. `None` logs through `tracing`.
    pub logger: Option<Arc<dyn ClientLogger>>,
    pub http: HttpSettings,
}

impl SlackClientConfig {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            logger: None,
            http: HttpSettings::default(),
        }
    }

    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    #[must_use]
    pub fn with_http(mut self, http: HttpSettings) -> Self {
        self.http = http;
        self
    }

    /// Load from `SLACK_BOT_TOKEN`, `SLACK_API_BASE_URL` and
    /// `SLACK_HTTP_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `SlackError::Configuration` when the token is missing or the
    /// timeout is not a whole number of seconds.
    pub fn from_env() -> Result<Self, SlackError> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SlackError> {
        Ok(Self {
            token: required(lookup, "SLACK_BOT_TOKEN")?,
            logger: None,
            http: HttpSettings::from_lookup(lookup)?,
        })
    }
}

impl fmt::Debug for SlackClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackClientConfig")
            .field("token", &"<redacted>")
            .field("logger", &self.logger.as_ref().map(|_| "<custom>"))
            .field("http", &self.http)
            .finish()
    }
}

/// Configuration for [`crate::slack::CanvasClient`].
#[derive(Debug, Clone)]
pub struct CanvasConfig {
    pub slack: SlackClientConfig,
    /// Canvas to edit. Absent means every canvas operation fails with
    /// `SlackError::Configuration` without touching the network.
    pub canvas_id: Option<String>,
}

impl CanvasConfig {
    #[must_use]
    pub fn new(token: impl Into<String>, canvas_id: Option<String>) -> Self {
        Self {
            slack: SlackClientConfig::new(token),
            canvas_id,
        }
    }

    /// Load from the base variables plus `SLACK_CANVAS_ID`.
    ///
    /// # Errors
    ///
    /// Returns `SlackError::Configuration` when the base configuration is invalid.
    pub fn from_env() -> Result<Self, SlackError> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SlackError> {
        Ok(Self {
            slack: SlackClientConfig::from_lookup(lookup)?,
            canvas_id: lookup("SLACK_CANVAS_ID"),
        })
    }
}

/// Configuration for [`crate::slack::ListClient`].
///
/// The webhooks must point at workflows built in Slack's UI:
/// - `webhook_add`: takes `name`, adds an item with Name = `name`.
/// - `webhook_delete`: takes `name`, selects the item by Name and deletes it.
/// - `webhook_complete`: takes `name` and `completed` (`Yes`/`No`), selects the
///   item by Name and sets its Completed field.
#[derive(Clone)]
pub struct ListConfig {
    pub slack: SlackClientConfig,
    /// List file id, needed only to read items back.
    pub list_id: Option<String>,
    pub webhook_add: String,
    pub webhook_delete: String,
    /// Absent means `set_completed` fails with `SlackError::Configuration`.
    pub webhook_complete: Option<String>,
    pub webhook_format: WebhookFormat,
}

impl ListConfig {
    #[must_use]
    pub fn new(
        token: impl Into<String>,
        webhook_add: impl Into<String>,
        webhook_delete: impl Into<String>,
    ) -> Self {
        Self {
            slack: SlackClientConfig::new(token),
            list_id: None,
            webhook_add: webhook_add.into(),
            webhook_delete: webhook_delete.into(),
            webhook_complete: None,
            webhook_format: WebhookFormat::default(),
        }
    }

    #[must_use]
    pub fn with_list_id(mut self, list_id: impl Into<String>) -> Self {
        self.list_id = Some(list_id.into());
        self
    }

    #[must_use]
    pub fn with_complete_webhook(mut self, url: impl Into<String>) -> Self {
        self.webhook_complete = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_webhook_format(mut self, format: WebhookFormat) -> Self {
        self.webhook_format = format;
        self
    }

    /// Load from the base variables plus `SLACK_LIST_ID`, `SLACK_WEBHOOK_ADD`,
    /// `SLACK_WEBHOOK_DELETE`, `SLACK_WEBHOOK_COMPLETE` and
    /// `SLACK_WEBHOOK_FORMAT` (`form` or `json`).
    ///
    /// # Errors
    ///
    /// Returns `SlackError::Configuration` when a required variable is missing
    /// or a value cannot be parsed.
    pub fn from_env() -> Result<Self, SlackError> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SlackError> {
        let webhook_format = match lookup("SLACK_WEBHOOK_FORMAT") {
            Some(name) => WebhookFormat::from_name(&name).ok_or_else(|| {
                SlackError::Configuration(format!(
                    "SLACK_WEBHOOK_FORMAT must be 'form' or 'json', got '{name}'"
                ))
            })?,
            None => WebhookFormat::default(),
        };

        Ok(Self {
            slack: SlackClientConfig::from_lookup(lookup)?,
            list_id: lookup("SLACK_LIST_ID"),
            webhook_add: required(lookup, "SLACK_WEBHOOK_ADD")?,
            webhook_delete: required(lookup, "SLACK_WEBHOOK_DELETE")?,
            webhook_complete: lookup("SLACK_WEBHOOK_COMPLETE"),
            webhook_format,
        })
    }
}

impl fmt::Debug for ListConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListConfig")
            .field("slack", &self.slack)
            .field("list_id", &self.list_id)
            .field("webhook_add", &redact_url(&self.webhook_add))
            .field("webhook_delete", &redact_url(&self.webhook_delete))
            .field(
                "webhook_complete",
                &self.webhook_complete.as_deref().map(redact_url),
            )
            .field("webhook_format", &self.webhook_format)
            .finish()
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, SlackError> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SlackError::Configuration(format!("{key} is not set")))
}
