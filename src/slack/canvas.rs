//! Canvas API client for replacing the content of one configured canvas.
//!
//! Every edit sends the complete replacement markdown; nothing about the
//! canvas is cached locally.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::Level;

use super::client::SlackClient;
use super::transport::HttpTransport;
use crate::core::config::CanvasConfig;
use crate::errors::SlackError;

/// Document content for Canvas operations
#[derive(Debug, Serialize)]
struct DocumentContent {
    #[serde(rename = "type")]
    content_type: &'static str,
    markdown: String,
}

/// Canvas edit operation
#[derive(Debug, Serialize)]
struct CanvasEditChange {
    operation: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    section_id: Option<String>,
    document_content: DocumentContent,
}

impl CanvasEditChange {
    fn replace(section_id: Option<&str>, markdown: &str) -> Self {
        Self {
            operation: "replace",
            section_id: section_id.map(str::to_string),
            document_content: DocumentContent {
                content_type: "markdown",
                markdown: markdown.to_string(),
            },
        }
    }
}

pub struct CanvasClient {
    slack: SlackClient,
    canvas_id: Option<String>,
}

impl CanvasClient {
    /// # Errors
    ///
    /// Returns `SlackError::Configuration` if the underlying client cannot be built.
    pub fn new(config: CanvasConfig) -> Result<Self, SlackError> {
        let slack = SlackClient::new(config.slack)?;
        Ok(Self::from_parts(slack, config.canvas_id))
    }

    /// # Errors
    ///
    /// Returns `SlackError::Configuration` for an empty token.
    pub fn with_transport(
        config: CanvasConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, SlackError> {
        let slack = SlackClient::with_transport(config.slack, transport)?;
        Ok(Self::from_parts(slack, config.canvas_id))
    }

    fn from_parts(slack: SlackClient, canvas_id: Option<String>) -> Self {
        let canvas_id = canvas_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        Self { slack, canvas_id }
    }

    #[must_use]
    pub fn slack(&self) -> &SlackClient {
        &self.slack
    }

    #[must_use]
    pub fn canvas_id(&self) -> Option<&str> {
        self.canvas_id.as_deref()
    }

    fn require_canvas_id(&self) -> Result<&str, SlackError> {
        self.canvas_id.as_deref().ok_or_else(|| {
            let err = SlackError::Configuration(
                "canvas_id was not configured; cannot edit or inspect the canvas".to_string(),
            );
            self.slack.log(Level::ERROR, &err.to_string());
            err
        })
    }

    /// Replace one section of the canvas, or the whole document when
    /// `section_id` is `None`, with `markdown_content`.
    ///
    /// # Errors
    ///
    /// `SlackError::Configuration` without a configured canvas id (nothing is
    /// sent), otherwise any error from `canvases.edit`.
    pub async fn set_section(
        &self,
        section_id: Option<&str>,
        markdown_content: &str,
    ) -> Result<(), SlackError> {
        let canvas_id = self.require_canvas_id()?;

        let edit_payload = json!({
            "canvas_id": canvas_id,
            "changes": [CanvasEditChange::replace(section_id, markdown_content)],
        });

        self.slack.call_api("canvases.edit", edit_payload).await?;

        self.slack.log(
            Level::INFO,
            &format!(
                "Canvas {canvas_id} updated ({})",
                section_id.map_or_else(|| "whole document".to_string(), |s| format!("section {s}"))
            ),
        );
        Ok(())
    }

    /// Replace the entire canvas with `markdown_content`.
    ///
    /// # Errors
    ///
    /// See [`Self::set_section`].
    pub async fn update_canvas(&self, markdown_content: &str) -> Result<(), SlackError> {
        self.set_section(None, markdown_content).await
    }

    /// Fetch the canvas' file object via `files.info`.
    ///
    /// # Errors
    ///
    /// `SlackError::Configuration` without a canvas id, Web API errors, or
    /// `SlackError::Parse` when the answer has no `file` object.
    pub async fn canvas_info(&self) -> Result<Value, SlackError> {
        let canvas_id = self.require_canvas_id()?;

        let mut body = self
            .slack
            .call_api_form("files.info", &[("file", canvas_id)])
            .await?;

        match body.get_mut("file").map(Value::take) {
            Some(file @ Value::Object(_)) => Ok(file),
            _ => Err(SlackError::Parse(
                "files.info: no file object in response".to_string(),
            )),
        }
    }

    /// Permalink of the canvas.
    ///
    /// # Errors
    ///
    /// Errors from [`Self::canvas_info`], or `SlackError::Parse` when the
    /// canvas has no permalink.
    pub async fn canvas_permalink(&self) -> Result<String, SlackError> {
        let info = self.canvas_info().await?;
        info.get("permalink")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SlackError::Parse("Canvas does not have a permalink".to_string()))
    }
}

impl fmt::Debug for CanvasClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanvasClient")
            .field("slack", &self.slack)
            .field("canvas_id", &self.canvas_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_content_serialization() {
        let content = DocumentContent {
            content_type: "markdown",
            markdown: "# Test Content".to_string(),
        };

        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["type"], "markdown");
        assert_eq!(json["markdown"], "# Test Content");
    }

    #[test]
    fn test_canvas_edit_change_serialization() {
        let change = CanvasEditChange::replace(Some("section123"), "Updated content");

        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["operation"], "replace");
        assert_eq!(json["section_id"], "section123");
        assert_eq!(json["document_content"]["markdown"], "Updated content");
    }

    #[test]
    fn test_whole_document_change_omits_section() {
        let change = CanvasEditChange::replace(None, "All new");

        let json = serde_json::to_value(&change).unwrap();
        assert!(json.get("section_id").is_none());
        assert_eq!(json["document_content"]["type"], "markdown");
    }
}
