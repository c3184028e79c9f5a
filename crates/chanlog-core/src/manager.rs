//! Single-flight export job manager.
//!
//! The job status lives in a `tokio::sync::watch` channel. The channel is the
//! only synchronization point: submission claims the slot with a
//! compare-and-set on the current value, the worker publishes progress
//! through it, and the terminal update (result or error plus
//! `running = false`) is a single write, so pollers never see a half-finished
//! job.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::AppError;
use crate::export;
use crate::job::{ExportRequest, JobConfig, JobStatus};
use crate::models::ExportResult;
use crate::pipeline::{self, ExportEvent, ExportReporter, TracingReporter};
use crate::traits::ApiTransport;

/// Owns the process-wide export slot.
///
/// Cheap to clone; clones share the same slot and status.
pub struct JobManager<T: ApiTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: ApiTransport> Clone for JobManager<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T> {
    transport: T,
    config: JobConfig,
    status: watch::Sender<JobStatus>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl<T: ApiTransport> JobManager<T> {
    pub fn new(transport: T, config: JobConfig) -> Self {
        let (status, _) = watch::channel(JobStatus::idle());
        Self {
            inner: Arc::new(Inner {
                transport,
                config,
                status,
                supervisor: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &JobConfig {
        &self.inner.config
    }

    /// Whether the transport has a credential to run jobs with.
    pub fn has_credential(&self) -> bool {
        self.inner.transport.has_credential()
    }

    /// Current status snapshot.
    pub fn status(&self) -> JobStatus {
        self.inner.status.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.status.borrow().running
    }

    /// Receiver notified on every status change.
    pub fn subscribe(&self) -> watch::Receiver<JobStatus> {
        self.inner.status.subscribe()
    }

    /// Start an export in the background and return its task id.
    ///
    /// Never waits: if a job already holds the slot this returns
    /// [`AppError::JobBusy`] with that job's progress and leaves it untouched.
    pub fn submit(&self, request: ExportRequest) -> Result<Uuid, AppError> {
        if !self.inner.transport.has_credential() {
            return Err(AppError::ValidationError(
                "no bot token is configured".into(),
            ));
        }

        let task_id = Uuid::new_v4();
        let mut busy_progress = None;
        let claimed = self.inner.status.send_if_modified(|status| {
            if status.running {
                busy_progress = Some(status.progress.clone());
                false
            } else {
                *status = JobStatus::started(task_id);
                true
            }
        });

        if !claimed {
            return Err(AppError::JobBusy {
                progress: busy_progress.unwrap_or_default(),
            });
        }

        tracing::info!(
            %task_id,
            links = request.urls.len(),
            format = %request.format,
            "Export job accepted"
        );

        let handle = self.spawn_supervised(task_id, request);
        if let Ok(mut slot) = self.inner.supervisor.lock() {
            *slot = Some(handle);
        }
        Ok(task_id)
    }

    /// Wait for the current job (if any) to reach a terminal state.
    pub async fn wait_until_idle(&self) -> JobStatus {
        let handle = self
            .inner
            .supervisor
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            tracing::error!(error = %e, "Export supervisor task failed");
        }

        let mut rx = self.inner.status.subscribe();
        let status = match rx.wait_for(|s| !s.running).await {
            Ok(status) => status.clone(),
            Err(_) => self.status(),
        };
        status
    }

    /// Run the job in its own task and record the outcome once it ends,
    /// including when the worker panics.
    fn spawn_supervised(&self, task_id: Uuid, request: ExportRequest) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let worker = Arc::clone(&inner);
            let outcome = match tokio::spawn(async move { worker.run(task_id, request).await }).await
            {
                Ok(outcome) => outcome,
                Err(e) => Err(AppError::Generic(format!("export worker aborted: {e}"))),
            };

            match &outcome {
                Ok(result) => tracing::info!(
                    %task_id,
                    messages = result.total_message_count,
                    threads = result.thread_count(),
                    output = %result.output_path,
                    "Export job succeeded"
                ),
                Err(e) => tracing::warn!(%task_id, error = %e, "Export job failed"),
            }

            inner.status.send_modify(move |status| match outcome {
                Ok(result) => status.succeed(result),
                Err(e) => status.fail(e.to_string()),
            });
        })
    }
}

impl<T: ApiTransport> Inner<T> {
    async fn run(&self, task_id: Uuid, request: ExportRequest) -> Result<ExportResult, AppError> {
        let reporter = ProgressReporter::new(&self.status, task_id);
        let stem = export::export_file_stem(task_id, Utc::now());
        pipeline::run_export(
            &self.transport,
            &request,
            self.config.pacing,
            &self.config.export_dir,
            &stem,
            &reporter,
        )
        .await
    }
}

/// Turns export events into progress text on the shared status.
struct ProgressReporter<'a> {
    status: &'a watch::Sender<JobStatus>,
    task_id: Uuid,
    link: Mutex<(usize, usize)>,
}

impl<'a> ProgressReporter<'a> {
    fn new(status: &'a watch::Sender<JobStatus>, task_id: Uuid) -> Self {
        Self {
            status,
            task_id,
            link: Mutex::new((0, 0)),
        }
    }

    fn link_prefix(&self) -> String {
        match self.link.lock() {
            Ok(link) => format!("link {}/{}", link.0, link.1),
            Err(_) => "link".to_string(),
        }
    }

    fn set_progress(&self, text: String) {
        self.status.send_if_modified(|status| {
            if status.running && status.task_id == Some(self.task_id) {
                status.progress = text;
                true
            } else {
                false
            }
        });
    }
}

impl ExportReporter for ProgressReporter<'_> {
    fn report(&self, event: ExportEvent<'_>) {
        TracingReporter.report(event.clone());

        let text = match event {
            ExportEvent::LinkStarted { index, total, .. } => {
                if let Ok(mut link) = self.link.lock() {
                    *link = (index, total);
                }
                format!("link {index}/{total}: resolving channel")
            }
            ExportEvent::ChannelResolved { channel } => {
                format!("{}: reading {}", self.link_prefix(), channel.name)
            }
            ExportEvent::ThreadsDiscovered { count, .. } => {
                format!("{}: {count} threads found", self.link_prefix())
            }
            ExportEvent::ThreadStarted {
                index,
                total,
                title,
            } => format!("{}: thread {index}/{total} ({title})", self.link_prefix()),
            ExportEvent::WritingOutput { .. } => "writing output".to_string(),
            _ => return,
        };
        self.set_progress(text);
    }
}
