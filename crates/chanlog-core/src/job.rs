use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ExportFormat, ExportResult};
use crate::throttle::Pacing;
use crate::window::DateWindow;

pub const PROGRESS_IDLE: &str = "idle";
pub const PROGRESS_STARTING: &str = "starting";
pub const PROGRESS_DONE: &str = "done";

/// Lifecycle of the export slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(JobState::Idle),
            "running" => Ok(JobState::Running),
            "succeeded" => Ok(JobState::Succeeded),
            "failed" => Ok(JobState::Failed),
            _ => Err(format!("Unknown job state: {s}")),
        }
    }
}

/// Snapshot of the process-wide export job.
///
/// `result` and `error` are only ever set together with the terminal state,
/// in the same update that clears `running`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatus {
    pub state: JobState,
    pub running: bool,
    pub task_id: Option<Uuid>,
    pub progress: String,
    pub result: Option<ExportResult>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobStatus {
    pub fn idle() -> Self {
        Self {
            state: JobState::Idle,
            running: false,
            task_id: None,
            progress: PROGRESS_IDLE.to_string(),
            result: None,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Fresh status for a newly accepted job.
    pub fn started(task_id: Uuid) -> Self {
        Self {
            state: JobState::Running,
            running: true,
            task_id: Some(task_id),
            progress: PROGRESS_STARTING.to_string(),
            result: None,
            error: None,
            started_at: Some(Utc::now()),
            finished_at: None,
        }
    }

    pub(crate) fn succeed(&mut self, result: ExportResult) {
        self.state = JobState::Succeeded;
        self.progress = PROGRESS_DONE.to_string();
        self.result = Some(result);
        self.error = None;
        self.finished_at = Some(Utc::now());
        self.running = false;
    }

    pub(crate) fn fail(&mut self, error: impl Into<String>) {
        self.state = JobState::Failed;
        self.result = None;
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
        self.running = false;
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::idle()
    }
}

/// A validated export submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub urls: Vec<String>,
    pub window: DateWindow,
    pub format: ExportFormat,
}

impl ExportRequest {
    /// Validate raw submission fields.
    ///
    /// Blank links are dropped; an empty remaining list or an unparseable
    /// date is a validation error.
    pub fn new(
        urls: Vec<String>,
        date_from: Option<&str>,
        date_to: Option<&str>,
        format: ExportFormat,
    ) -> Result<Self, AppError> {
        let urls: Vec<String> = urls
            .into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        if urls.is_empty() {
            return Err(AppError::ValidationError(
                "at least one channel link is required".into(),
            ));
        }

        let window = DateWindow::parse(date_from, date_to)?;
        Ok(Self {
            urls,
            window,
            format,
        })
    }
}

/// Settings shared by every job a manager runs.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub export_dir: PathBuf,
    pub pacing: Pacing,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("exports"),
            pacing: Pacing::default(),
        }
    }
}

impl JobConfig {
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }
}
