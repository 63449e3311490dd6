//! Slack list client.
//!
//! Slack has no Web API method for writing list items, so writes go through
//! workflow webhooks the caller builds in Slack's UI. A 2xx answer only means
//! the workflow was triggered; whether it found and changed the item is not
//! observable from here.
//!
//! Workflows select items by Name. If several items share a name, which of
//! them is touched depends on the workflow, so callers must keep names unique.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::Level;

use super::client::SlackClient;
use super::transport::HttpTransport;
use super::webhook::{WebhookFormat, WebhookUrl};
use crate::core::config::ListConfig;
use crate::core::models::{ListItem, SyncReport};
use crate::errors::SlackError;

/// Value sent in the `completed` field of the complete-toggle webhook.
#[must_use]
pub fn completed_flag(completed: bool) -> &'static str {
    if completed { "Yes" } else { "No" }
}

/// Webhook calls needed to turn `current` into `desired`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub remove: Vec<String>,
    pub uncomplete: Vec<String>,
    pub add: Vec<String>,
}

impl SyncPlan {
    /// Items missing from `desired` are removed, `desired` names missing from
    /// `current` are added once each, and when `uncomplete` is set, kept items
    /// that are completed are flipped back.
    ///
    /// Names are compared trimmed. Blank names on either side are ignored: no
    /// workflow can select a row without a name.
    #[must_use]
    pub fn build(current: &[ListItem], desired: &[String], uncomplete: bool) -> Self {
        let wanted: HashSet<&str> = desired
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .collect();
        let existing: HashSet<&str> = current.iter().map(|i| i.name.trim()).collect();

        let mut plan = Self::default();
        for item in current {
            let name = item.name.trim();
            if name.is_empty() {
                continue;
            }
            if !wanted.contains(name) {
                plan.remove.push(name.to_string());
            } else if uncomplete && item.completed {
                plan.uncomplete.push(name.to_string());
            }
        }

        let mut queued = HashSet::new();
        for name in desired.iter().map(|n| n.trim()) {
            if !name.is_empty() && !existing.contains(name) && queued.insert(name) {
                plan.add.push(name.to_string());
            }
        }
        plan
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.uncomplete.is_empty() && self.add.is_empty()
    }
}

pub struct ListClient {
    slack: SlackClient,
    list_id: Option<String>,
    webhook_add: WebhookUrl,
    webhook_delete: WebhookUrl,
    webhook_complete: Option<WebhookUrl>,
    webhook_format: WebhookFormat,
}

impl ListClient {
    /// # Errors
    ///
    /// Returns `SlackError::Configuration` when a webhook URL is not a Slack
    /// workflow trigger URL or the token is empty.
    pub fn new(config: ListConfig) -> Result<Self, SlackError> {
        let slack = SlackClient::new(config.slack.clone())?;
        Self::from_parts(slack, config)
    }

    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn with_transport(
        config: ListConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, SlackError> {
        let slack = SlackClient::with_transport(config.slack.clone(), transport)?;
        Self::from_parts(slack, config)
    }

    fn from_parts(slack: SlackClient, config: ListConfig) -> Result<Self, SlackError> {
        let webhook_add = WebhookUrl::parse("webhook_add", &config.webhook_add)?;
        let webhook_delete = WebhookUrl::parse("webhook_delete", &config.webhook_delete)?;
        let webhook_complete = config
            .webhook_complete
            .as_deref()
            .map(|url| WebhookUrl::parse("webhook_complete", url))
            .transpose()?;

        Ok(Self {
            slack,
            list_id: config
                .list_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            webhook_add,
            webhook_delete,
            webhook_complete,
            webhook_format: config.webhook_format,
        })
    }

    #[must_use]
    pub fn slack(&self) -> &SlackClient {
        &self.slack
    }

    #[must_use]
    pub fn list_id(&self) -> Option<&str> {
        self.list_id.as_deref()
    }

    #[must_use]
    pub fn can_complete(&self) -> bool {
        self.webhook_complete.is_some()
    }

    fn configuration_error(&self, message: &str) -> SlackError {
        self.slack.log(Level::ERROR, message);
        SlackError::Configuration(message.to_string())
    }

    /// Item names are sent and matched trimmed.
    fn require_name(name: &str) -> Result<&str, SlackError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SlackError::InvalidInput(
                "list item name must not be empty".to_string(),
            ));
        }
        Ok(name)
    }

    fn warn_unnamed(&self, items: &[ListItem]) -> usize {
        let unnamed = items.iter().filter(|i| i.name.trim().is_empty()).count();
        if unnamed > 0 {
            self.slack.log(
                Level::WARN,
                &format!("Skipping {unnamed} list item(s) with an empty Name"),
            );
        }
        unnamed
    }

    /// Trigger the add workflow for `name`. Only starts the workflow; any
    /// local copy of the list must be updated separately.
    ///
    /// # Errors
    ///
    /// `SlackError::Webhook` on a non-2xx answer, `SlackError::Transport` when
    /// the request could not be sent.
    pub async fn add_item(&self, name: &str) -> Result<(), SlackError> {
        let name = Self::require_name(name)?;
        self.slack
            .trigger_webhook(&self.webhook_add, self.webhook_format, &[("name", name)])
            .await?;
        self.slack
            .log(Level::INFO, &format!("{name} added to the list successfully"));
        Ok(())
    }

    /// Trigger the delete workflow for `name`.
    ///
    /// # Errors
    ///
    /// See [`Self::add_item`].
    pub async fn remove_item(&self, name: &str) -> Result<(), SlackError> {
        let name = Self::require_name(name)?;
        self.slack
            .trigger_webhook(&self.webhook_delete, self.webhook_format, &[("name", name)])
            .await?;
        self.slack.log(
            Level::INFO,
            &format!("Item '{name}' deleted from the list successfully"),
        );
        Ok(())
    }

    /// Trigger the complete workflow, setting Completed to `Yes` or `No`.
    ///
    /// # Errors
    ///
    /// `SlackError::Configuration` when no complete webhook was configured
    /// (nothing is sent), otherwise as [`Self::add_item`].
    pub async fn set_completed(&self, name: &str, completed: bool) -> Result<(), SlackError> {
        let Some(webhook) = &self.webhook_complete else {
            return Err(self.configuration_error(
                "Webhook for completing items is not set. Cannot complete or un-complete items.",
            ));
        };
        let name = Self::require_name(name)?;

        self.slack
            .trigger_webhook(
                webhook,
                self.webhook_format,
                &[("name", name), ("completed", completed_flag(completed))],
            )
            .await?;
        self.slack.log(
            Level::INFO,
            &format!(
                "Item '{name}' {} successfully",
                if completed { "completed" } else { "un-completed" }
            ),
        );
        Ok(())
    }

    /// Read the list back through its CSV export.
    ///
    /// # Errors
    ///
    /// `SlackError::Configuration` without a list id, Web API or download
    /// errors, or `SlackError::Parse` for an unexpected `files.info` answer or
    /// malformed CSV.
    pub async fn get_list_items(&self) -> Result<Vec<ListItem>, SlackError> {
        let Some(list_id) = self.list_id.as_deref() else {
            return Err(self.configuration_error(
                "list_id was not configured; cannot read list items",
            ));
        };

        let info = self
            .slack
            .call_api_form("files.info", &[("file", list_id)])
            .await?;
        let csv_url = info
            .get("file")
            .and_then(|f| f.get("list_csv_download_url"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                SlackError::Parse("files.info: no list_csv_download_url for list".to_string())
            })?;

        let csv_text = self.slack.download_text("list CSV download", csv_url).await?;
        let items = parse_list_csv(&csv_text, |name, raw| {
            self.slack.log(
                Level::ERROR,
                &format!("Invalid date format for '{name}': {raw}"),
            );
        })?;

        self.slack
            .log(Level::DEBUG, &format!("Fetched {} list items", items.len()));
        Ok(items)
    }

    /// Set the Completed state of `name` only if it exists and differs.
    /// Returns whether the webhook was triggered.
    ///
    /// # Errors
    ///
    /// `SlackError::Configuration` when no complete webhook is configured,
    /// then errors from [`Self::get_list_items`] or [`Self::set_completed`].
    pub async fn complete_item(&self, name: &str, completed: bool) -> Result<bool, SlackError> {
        if self.webhook_complete.is_none() {
            return Err(self.configuration_error(
                "Webhook for completing items is not set. Cannot complete or un-complete items.",
            ));
        }
        let name = Self::require_name(name)?;

        let items = self.get_list_items().await?;
        let Some(item) = items.iter().find(|i| i.name.trim() == name) else {
            self.slack.log(
                Level::WARN,
                &format!("Item '{name}' does not exist in the list."),
            );
            return Ok(false);
        };

        if item.completed == completed {
            self.slack.log(
                Level::INFO,
                &format!(
                    "Item '{name}' is already {}.",
                    if completed { "completed" } else { "not completed" }
                ),
            );
            return Ok(false);
        }

        self.set_completed(name, completed).await?;
        Ok(true)
    }

    /// Make the list contain exactly `new_items`.
    ///
    /// Issues one webhook call per change and stops at the first failure, so
    /// an error can leave the list partially synced. Webhooks run
    /// sequentially.
    ///
    /// # Errors
    ///
    /// `SlackError::InvalidInput` for a blank name in `new_items` (nothing is
    /// sent), `SlackError::Configuration` (before any webhook fires) when
    /// completed items need un-completing but no complete webhook is
    /// configured, then the first read or webhook error.
    pub async fn update_list(
        &self,
        new_items: &[String],
        uncomplete: bool,
    ) -> Result<SyncReport, SlackError> {
        for name in new_items {
            Self::require_name(name)?;
        }

        let current = self.get_list_items().await?;
        self.warn_unnamed(&current);
        let plan = SyncPlan::build(&current, new_items, uncomplete);

        if !plan.uncomplete.is_empty() && self.webhook_complete.is_none() {
            return Err(self.configuration_error(
                "Webhook for completing items is not set. Cannot un-complete kept items.",
            ));
        }

        let mut report = SyncReport::default();
        for name in &plan.remove {
            self.remove_item(name).await?;
            report.removed += 1;
        }
        for name in &plan.uncomplete {
            self.set_completed(name, false).await?;
            report.uncompleted += 1;
        }
        for name in &plan.add {
            self.add_item(name).await?;
            report.added += 1;
        }

        self.slack.log(
            Level::INFO,
            &format!(
                "List synced: {} added, {} removed, {} un-completed",
                report.added, report.removed, report.uncompleted
            ),
        );
        Ok(report)
    }

    /// Delete every named item. Returns how many delete triggers were sent;
    /// rows with an empty Name cannot be selected by the workflow and are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// The first read or webhook error.
    pub async fn clear_list(&self) -> Result<usize, SlackError> {
        self.slack.log(Level::INFO, "Clearing the Slack list...");
        let items = self.get_list_items().await?;
        self.warn_unnamed(&items);

        let mut removed = 0;
        for item in items.iter().filter(|i| !i.name.trim().is_empty()) {
            self.remove_item(&item.name).await?;
            removed += 1;
        }
        self.slack.log(Level::INFO, "Done clearing the Slack list.");
        Ok(removed)
    }
}

impl fmt::Debug for ListClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListClient")
            .field("slack", &self.slack)
            .field("list_id", &self.list_id)
            .field("webhook_add", &self.webhook_add)
            .field("webhook_delete", &self.webhook_delete)
            .field("webhook_complete", &self.webhook_complete)
            .field("webhook_format", &self.webhook_format)
            .finish()
    }
}

/// Parse Slack's list CSV export.
///
/// Requires a `Name` column; `Completed`, `Assignee` and `Due Date` are read
/// when present. Unparseable due dates become `None` and are reported through
/// `on_invalid_date(item_name, raw_value)`.
///
/// # Errors
///
/// `SlackError::Parse` when the CSV is malformed or has no `Name` column.
pub fn parse_list_csv(
    text: &str,
    mut on_invalid_date: impl FnMut(&str, &str),
) -> Result<Vec<ListItem>, SlackError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| SlackError::Parse(format!("list CSV header: {e}")))?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);

    let name_col = column("Name")
        .ok_or_else(|| SlackError::Parse("list CSV has no 'Name' column".to_string()))?;
    let completed_col = column("Completed");
    let assignee_col = column("Assignee");
    let due_col = column("Due Date");

    let mut items = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SlackError::Parse(format!("list CSV row: {e}")))?;
        let cell = |col: Option<usize>| col.and_then(|i| record.get(i)).map(str::trim);

        let name = cell(Some(name_col)).unwrap_or_default().to_string();
        let completed = cell(completed_col).is_some_and(|v| v.eq_ignore_ascii_case("true"));
        let assignee = cell(assignee_col)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let due_date = match cell(due_col).filter(|v| !v.is_empty()) {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| on_invalid_date(&name, raw))
                .ok(),
            None => None,
        };

        items.push(ListItem {
            name,
            completed,
            assignee,
            due_date,
        });
    }
    Ok(items)
}
