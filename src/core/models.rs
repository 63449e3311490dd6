use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP verb of an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Body of an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
    Empty,
}

impl RequestBody {
    /// Look up a field by name in a form or top-level JSON object body.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<String> {
        match self {
            Self::Json(value) => value.get(name).map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            Self::Form(fields) => fields
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone()),
            Self::Empty => None,
        }
    }
}

/// A single request, built fresh per call and never retained.
#[derive(Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Bearer token for Web API calls. Webhook URLs embed their own secret, so
    /// webhook requests leave this empty.
    pub bearer: Option<String>,
    pub body: RequestBody,
}

impl ApiRequest {
    #[must_use]
    pub fn post(url: impl Into<String>, body: RequestBody) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            bearer: None,
            body,
        }
    }

    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            bearer: None,
            body: RequestBody::Empty,
        }
    }

    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("url", &crate::slack::webhook::redact_url(&self.url))
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .field("body", &self.body)
            .finish()
    }
}

/// Raw HTTP outcome of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON, if it is JSON.
    #[must_use]
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// First 200 characters of the body, for error messages.
    #[must_use]
    pub fn body_snippet(&self) -> String {
        let trimmed = self.body.trim();
        if trimmed.chars().count() > 200 {
            format!("{}…", trimmed.chars().take(200).collect::<String>())
        } else {
            trimmed.to_string()
        }
    }
}

/// One row of a Slack list, as exported by Slack's CSV download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub name: String,
    pub completed: bool,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// Counts of webhook triggers fired by a list sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub added: usize,
    pub removed: usize,
    pub uncompleted: usize,
}
