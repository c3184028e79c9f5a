use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chanlog_core::job::JobStatus;
use chanlog_core::models::{ExportResult, ThreadRecord};

// ---------------------------------------------------------------------------
// Exports
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateExportRequest {
    /// Channel or forum links, `https://discord.com/channels/<community>/<channel>`.
    pub urls: Vec<String>,
    /// Inclusive start, `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM[:SS]` (UTC).
    pub date_from: Option<String>,
    /// Inclusive end; a date-only value covers the whole day.
    pub date_to: Option<String>,
    /// `tabular` (default), `text` or `markup`.
    pub format: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CreateExportResponse {
    pub task_id: Uuid,
    pub status: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ThreadSummaryResponse {
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
}

impl From<&ThreadRecord> for ThreadSummaryResponse {
    fn from(record: &ThreadRecord) -> Self {
        Self {
            title: record.title.clone(),
            created_at: record.created_at,
            message_count: record.messages.len(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ExportSummaryResponse {
    pub file_name: String,
    pub download_url: String,
    pub total_message_count: usize,
    pub thread_count: usize,
    pub threads: Vec<ThreadSummaryResponse>,
}

impl From<&ExportResult> for ExportSummaryResponse {
    fn from(result: &ExportResult) -> Self {
        let file_name = Path::new(&result.output_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            download_url: format!("/v1/exports/files/{file_name}"),
            file_name,
            total_message_count: result.total_message_count,
            thread_count: result.thread_count(),
            threads: result
                .thread_records
                .iter()
                .map(ThreadSummaryResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ExportStatusResponse {
    pub state: String,
    pub running: bool,
    pub task_id: Option<Uuid>,
    pub progress: String,
    pub result: Option<ExportSummaryResponse>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<JobStatus> for ExportStatusResponse {
    fn from(status: JobStatus) -> Self {
        Self {
            state: status.state.to_string(),
            running: status.running,
            task_id: status.task_id,
            progress: status.progress,
            result: status.result.as_ref().map(ExportSummaryResponse::from),
            error: status.error,
            started_at: status.started_at,
            finished_at: status.finished_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CredentialResponse {
    pub configured: bool,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub export_running: bool,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
