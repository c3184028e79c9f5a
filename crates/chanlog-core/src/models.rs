use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Channel types whose content is split into threads.
const FORUM_CHANNEL_TYPES: [u8; 2] = [15, 16];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Forum,
    Standard,
}

impl ChannelKind {
    pub fn from_type_code(code: u8) -> Self {
        if FORUM_CHANNEL_TYPES.contains(&code) {
            ChannelKind::Forum
        } else {
            ChannelKind::Standard
        }
    }
}

/// Channel metadata, fetched once per input link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelInfo {
    pub id: String,
    pub kind: ChannelKind,
    pub name: String,
}

/// One forum thread as listed by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadSummary {
    pub id: String,
    pub name: String,
    /// Continuation token for archived-thread pagination.
    pub archive_cursor: Option<String>,
}

/// A message as returned by the remote API, before formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawMessage {
    pub id: String,
    pub author_name: String,
    pub content: String,
    pub attachment_urls: Vec<String>,
}

/// A formatted message ready for serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    pub id: String,
    pub author: String,
    pub occurred_at: DateTime<Utc>,
    pub content: String,
    /// Attachment URLs joined by newlines; empty when there are none.
    pub attachments: String,
    pub permalink: String,
}

/// A thread (or standard channel) with its messages in ascending id order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadRecord {
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<MessageRecord>,
}

/// Outcome of a successful export job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportResult {
    pub thread_records: Vec<ThreadRecord>,
    pub total_message_count: usize,
    pub output_path: String,
}

impl ExportResult {
    pub fn thread_count(&self) -> usize {
        self.thread_records.len()
    }
}

/// Output representation of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma-separated rows, one per message.
    #[default]
    Tabular,
    /// Plain text with one banner per thread.
    Text,
    /// HTML document with one section per thread.
    Markup,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Tabular => "tabular",
            ExportFormat::Text => "text",
            ExportFormat::Markup => "markup",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Tabular => "csv",
            ExportFormat::Text => "txt",
            ExportFormat::Markup => "html",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tabular" | "csv" | "excel" => Ok(ExportFormat::Tabular),
            "text" | "txt" => Ok(ExportFormat::Text),
            "markup" | "html" => Ok(ExportFormat::Markup),
            _ => Err(format!("Unknown export format: {s}")),
        }
    }
}

// ---- Remote API payloads ----

#[derive(Debug, Deserialize)]
pub(crate) struct ApiChannel {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<ApiChannel> for ChannelInfo {
    fn from(c: ApiChannel) -> Self {
        Self {
            id: c.id,
            kind: ChannelKind::from_type_code(c.kind),
            name: c.name.unwrap_or_else(|| "unknown-channel".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiThreadList {
    #[serde(default)]
    pub threads: Vec<ApiThread>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiThread {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub thread_metadata: Option<ApiThreadMetadata>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiThreadMetadata {
    #[serde(default)]
    pub archive_timestamp: Option<String>,
}

impl From<ApiThread> for ThreadSummary {
    fn from(t: ApiThread) -> Self {
        Self {
            id: t.id,
            name: t.name,
            archive_cursor: t.thread_metadata.and_then(|m| m.archive_timestamp),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiMessage {
    pub id: String,
    #[serde(default)]
    pub author: Option<ApiAuthor>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub attachments: Vec<ApiAttachment>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiAuthor {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiAttachment {
    #[serde(default)]
    pub url: String,
}

impl From<ApiMessage> for RawMessage {
    fn from(m: ApiMessage) -> Self {
        Self {
            id: m.id,
            author_name: m
                .author
                .and_then(|a| a.username)
                .unwrap_or_else(|| "unknown".to_string()),
            content: m.content.unwrap_or_default(),
            attachment_urls: m.attachments.into_iter().map(|a| a.url).collect(),
        }
    }
}
