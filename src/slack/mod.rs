//! All Slack-specific functionality

pub mod canvas;
pub mod client;
pub mod list;
pub mod logger;
pub mod transport;
pub mod webhook;

// Re-export main types for convenience
pub use canvas::CanvasClient;
pub use client::SlackClient;
pub use list::{ListClient, SyncPlan, completed_flag, parse_list_csv};
pub use logger::{ClientLogger, TracingLogger};
pub use transport::{HttpTransport, ReqwestTransport};
#[cfg(any(test, feature = "test-util"))]
pub use transport::MockTransport;
pub use webhook::{WebhookFormat, WebhookUrl, is_valid_webhook_url, redact_url};
