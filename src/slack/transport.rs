//! HTTP transport seam.
//!
//! Every request the clients make goes through an [`HttpTransport`]. The
//! default [`ReqwestTransport`] shares one connection-pooled `reqwest::Client`,
//! which is safe to use from many tasks at once. `MockTransport` (built for
//! tests and under the `test-util` feature) replays scripted responses and
//! records what was sent.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::core::models::{ApiRequest, ApiResponse, HttpMethod, RequestBody};
use crate::errors::SlackError;

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send one request and return the raw status and body.
    ///
    /// # Errors
    ///
    /// Returns `SlackError::Transport` when no HTTP response was received.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, SlackError>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns `SlackError::Configuration` if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self, SlackError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            SlackError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;
        Ok(Self { client })
    }

    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, SlackError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        builder = match &request.body {
            RequestBody::Json(payload) => builder.json(payload),
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Empty => builder,
        };

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;

        Ok(ApiResponse { status, body })
    }
}

#[cfg(any(test, feature = "test-util"))]
pub use mock::MockTransport;

#[cfg(any(test, feature = "test-util"))]
mod mock {
    use std::collections::VecDeque;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    use async_trait::async_trait;
    use serde_json::Value;

    use super::HttpTransport;
    use crate::core::models::{ApiRequest, ApiResponse};
    use crate::errors::SlackError;
    use crate::slack::webhook::redact_url;

    enum MockReply {
        Response(ApiResponse),
        TransportFailure(String),
    }

    /// In-memory transport that replays queued replies in order and records every
    /// request. Running out of replies is reported as a transport failure.
    #[derive(Default)]
    pub struct MockTransport {
        replies: Mutex<VecDeque<MockReply>>,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl MockTransport {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_response(&self, status: u16, body: impl Into<String>) {
            self.lock_replies()
                .push_back(MockReply::Response(ApiResponse::new(status, body)));
        }

        pub fn push_json(&self, status: u16, body: &Value) {
            self.push_response(status, body.to_string());
        }

        pub fn push_transport_failure(&self, detail: impl Into<String>) {
            self.lock_replies()
                .push_back(MockReply::TransportFailure(detail.into()));
        }

        #[must_use]
        pub fn requests(&self) -> Vec<ApiRequest> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        #[must_use]
        pub fn request_count(&self) -> usize {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }

        fn lock_replies(&self) -> MutexGuard<'_, VecDeque<MockReply>> {
            self.replies.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, SlackError> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());

            let reply = self.lock_replies().pop_front();
            match reply {
                Some(MockReply::Response(resp)) => Ok(resp),
                Some(MockReply::TransportFailure(detail)) => Err(SlackError::Transport {
                    target: redact_url(&request.url),
                    detail,
                }),
                None => Err(SlackError::Transport {
                    target: redact_url(&request.url),
                    detail: "mock transport has no scripted reply".to_string(),
                }),
            }
        }
    }
}
