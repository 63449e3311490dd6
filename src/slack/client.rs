//! Slack Web API client module
//!
//! Holds the token and the single "send request, interpret response" path used
//! by every Web API call. Webhook and download plumbing for the list client
//! share the same transport and logger.

use std::fmt;
use std::sync::Arc;

use serde_json::{Value, json};
use slack_morphism::{SlackApiToken, SlackApiTokenValue, SlackTs};
use tracing::Level;

use crate::core::config::SlackClientConfig;
use crate::core::models::{ApiRequest, ApiResponse, RequestBody};
use crate::errors::SlackError;
use crate::slack::logger::{self, ClientLogger, TracingLogger};
use crate::slack::transport::{HttpTransport, ReqwestTransport};
use crate::slack::webhook::{WebhookFormat, WebhookUrl};

/// Slack Web API client.
///
/// Cheap to share behind an `Arc`; calls from several tasks at once only read
/// the token and go through a connection-pooled transport.
pub struct SlackClient {
    token: SlackApiToken,
    api_base_url: String,
    transport: Arc<dyn HttpTransport>,
    logger: Arc<dyn ClientLogger>,
}

impl SlackClient {
    /// Build a client backed by `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns `SlackError::Configuration` for an empty token or if the HTTP
    /// client cannot be built.
    pub fn new(config: SlackClientConfig) -> Result<Self, SlackError> {
        let transport = ReqwestTransport::new(config.http.timeout)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Build a client that sends through `transport`.
    ///
    /// # Errors
    ///
    /// Returns `SlackError::Configuration` for an empty token.
    pub fn with_transport(
        config: SlackClientConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, SlackError> {
        let token = config.token.trim();
        if token.is_empty() {
            return Err(SlackError::Configuration(
                "Slack API token must not be empty".to_string(),
            ));
        }

        Ok(Self {
            token: SlackApiToken::new(SlackApiTokenValue::new(token.to_string())),
            api_base_url: config.http.api_base_url.trim_end_matches('/').to_string(),
            transport,
            logger: config
                .logger
                .unwrap_or_else(|| Arc::new(TracingLogger) as Arc<dyn ClientLogger>),
        })
    }

    #[must_use]
    pub fn token(&self) -> &SlackApiToken {
        &self.token
    }

    pub(crate) fn log(&self, level: Level, message: &str) {
        logger::emit(self.logger.as_ref(), level, message);
    }

    fn method_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.api_base_url, endpoint)
    }

    /// Call a Web API method with a JSON body.
    ///
    /// Succeeds only when Slack answers 2xx with `"ok": true`, returning the
    /// parsed body.
    ///
    /// # Errors
    ///
    /// - `SlackError::InvalidInput` for an empty endpoint (nothing is sent).
    /// - `SlackError::Transport` when no response arrives.
    /// - `SlackError::Api` for a non-2xx status, a non-JSON body or `"ok": false`.
    pub async fn call_api(&self, endpoint: &str, payload: Value) -> Result<Value, SlackError> {
        self.execute(endpoint, RequestBody::Json(payload)).await
    }

    /// Same contract as [`Self::call_api`] with a form-encoded body, for read
    /// methods such as `files.info` that do not accept JSON.
    ///
    /// # Errors
    ///
    /// See [`Self::call_api`].
    pub async fn call_api_form(
        &self,
        endpoint: &str,
        fields: &[(&str, &str)],
    ) -> Result<Value, SlackError> {
        self.execute(endpoint, WebhookFormat::Form.encode(fields)).await
    }

    async fn execute(&self, endpoint: &str, body: RequestBody) -> Result<Value, SlackError> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(SlackError::InvalidInput(
                "Slack API endpoint must not be empty".to_string(),
            ));
        }

        let request = ApiRequest::post(self.method_url(endpoint), body)
            .with_bearer(self.token.token_value.0.clone());

        let result = match self.transport.send(&request).await {
            Ok(response) => interpret_api_response(endpoint, &response),
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => self.log(Level::DEBUG, &format!("{endpoint} succeeded")),
            Err(e) => self.log(Level::ERROR, &format!("{endpoint} failed: {e}")),
        }
        result
    }

    /// Post a plain-text message to a channel via `chat.postMessage`.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is empty, the call fails, or Slack's
    /// answer carries no message timestamp.
    pub async fn send_message(
        &self,
        channel_id: &str,
        message: &str,
    ) -> Result<SlackTs, SlackError> {
        if channel_id.trim().is_empty() {
            return Err(SlackError::InvalidInput(
                "channel must not be empty".to_string(),
            ));
        }

        let payload = json!({
            "channel": channel_id,
            "text": message,
        });
        let body = self.call_api("chat.postMessage", payload).await?;

        let ts = body
            .get("ts")
            .and_then(Value::as_str)
            .ok_or_else(|| SlackError::Parse("chat.postMessage: no ts in response".to_string()))?;

        self.log(Level::INFO, &format!("Message sent successfully: {ts}"));
        Ok(SlackTs(ts.to_string()))
    }

    /// Trigger a workflow webhook. Only the HTTP status is meaningful: Slack
    /// acknowledges the trigger and says nothing about what the workflow did.
    pub(crate) async fn trigger_webhook(
        &self,
        webhook: &WebhookUrl,
        format: WebhookFormat,
        fields: &[(&str, &str)],
    ) -> Result<(), SlackError> {
        let request = ApiRequest::post(webhook.as_str(), format.encode(fields));

        let result = match self.transport.send(&request).await {
            Ok(response) if response.is_success() => Ok(()),
            Ok(response) => Err(SlackError::Webhook {
                webhook: webhook.redacted(),
                status: response.status,
                body: response.body_snippet(),
            }),
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => self.log(
                Level::DEBUG,
                &format!("Webhook {} accepted trigger", webhook.redacted()),
            ),
            Err(e) => self.log(Level::ERROR, &format!("Webhook trigger failed: {e}")),
        }
        result
    }

    /// Authenticated GET of a Slack-hosted file, returning its text.
    pub(crate) async fn download_text(&self, label: &str, url: &str) -> Result<String, SlackError> {
        let request = ApiRequest::get(url).with_bearer(self.token.token_value.0.clone());

        let result = match self.transport.send(&request).await {
            Ok(response) if response.is_success() => Ok(response.body),
            Ok(response) => Err(SlackError::Api {
                endpoint: label.to_string(),
                status: response.status,
                error: response.body_snippet(),
            }),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            self.log(Level::ERROR, &format!("{label} failed: {e}"));
        }
        result
    }
}

impl fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackClient")
            .field("token", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .finish_non_exhaustive()
    }
}

/// Decide success from status and body. Slack signals most failures with HTTP
/// 200 and `"ok": false`, so both are checked.
fn interpret_api_response(endpoint: &str, response: &ApiResponse) -> Result<Value, SlackError> {
    let parsed = response.json();
    let slack_error = parsed
        .as_ref()
        .and_then(|b| b.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string);

    if !response.is_success() {
        return Err(SlackError::Api {
            endpoint: endpoint.to_string(),
            status: response.status,
            error: slack_error.unwrap_or_else(|| response.body_snippet()),
        });
    }

    let Some(body) = parsed else {
        return Err(SlackError::Api {
            endpoint: endpoint.to_string(),
            status: response.status,
            error: format!("invalid JSON response: {}", response.body_snippet()),
        });
    };

    if body.get("ok").and_then(Value::as_bool) == Some(true) {
        Ok(body)
    } else {
        Err(SlackError::Api {
            endpoint: endpoint.to_string(),
            status: response.status,
            error: slack_error.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}
