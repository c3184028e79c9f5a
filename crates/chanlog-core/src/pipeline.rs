//! The per-link export walk: parse → channel info → aggregate → serialize.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::aggregate::Aggregator;
use crate::error::AppError;
use crate::export;
use crate::job::ExportRequest;
use crate::models::{ApiChannel, ChannelInfo, ExportFormat, ExportResult, ThreadRecord};
use crate::reference;
use crate::throttle::Pacing;
use crate::traits::ApiTransport;

/// Events emitted while an export runs, for logging and progress text.
#[derive(Debug, Clone)]
pub enum ExportEvent<'a> {
    LinkStarted {
        index: usize,
        total: usize,
        url: &'a str,
    },
    LinkSkipped {
        url: &'a str,
        reason: &'a str,
    },
    ChannelResolved {
        channel: &'a ChannelInfo,
    },
    ThreadsDiscovered {
        channel_id: &'a str,
        count: usize,
    },
    ThreadOutOfWindow {
        title: &'a str,
        created_at: DateTime<Utc>,
    },
    ThreadStarted {
        index: usize,
        total: usize,
        title: &'a str,
    },
    ThreadCollected {
        title: &'a str,
        messages: usize,
    },
    WritingOutput {
        format: ExportFormat,
        threads: usize,
        messages: usize,
    },
    Finished {
        output_path: &'a str,
        messages: usize,
    },
}

/// Receives export events (decoupled logging).
pub trait ExportReporter: Send + Sync {
    fn report(&self, event: ExportEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ExportReporter for NoopReporter {}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ExportReporter for TracingReporter {
    fn report(&self, event: ExportEvent<'_>) {
        match event {
            ExportEvent::LinkStarted { index, total, url } => {
                tracing::info!(%index, %total, %url, "Processing link");
            }
            ExportEvent::LinkSkipped { url, reason } => {
                tracing::warn!(%url, %reason, "Skipping link");
            }
            ExportEvent::ChannelResolved { channel } => {
                tracing::info!(
                    channel_id = %channel.id,
                    name = %channel.name,
                    kind = ?channel.kind,
                    "Channel resolved"
                );
            }
            ExportEvent::ThreadsDiscovered { channel_id, count } => {
                tracing::info!(%channel_id, %count, "Threads discovered");
            }
            ExportEvent::ThreadOutOfWindow { title, created_at } => {
                tracing::debug!(%title, %created_at, "Thread created outside window");
            }
            ExportEvent::ThreadStarted {
                index,
                total,
                title,
            } => {
                tracing::debug!(%index, %total, %title, "Fetching thread");
            }
            ExportEvent::ThreadCollected { title, messages } => {
                tracing::info!(%title, %messages, "Collected messages");
            }
            ExportEvent::WritingOutput {
                format,
                threads,
                messages,
            } => {
                tracing::info!(%format, %threads, %messages, "Writing output");
            }
            ExportEvent::Finished {
                output_path,
                messages,
            } => {
                tracing::info!(%output_path, %messages, "Export finished");
            }
        }
    }
}

/// Fetch metadata for a channel.
///
/// Any failure maps to [`AppError::Skipped`]: one unreachable channel must
/// not abort the rest of the job.
pub async fn fetch_channel_info<T: ApiTransport>(
    transport: &T,
    channel_id: &str,
) -> Result<ChannelInfo, AppError> {
    let response = transport
        .get(&format!("/channels/{channel_id}"), &[])
        .await
        .map_err(|e| AppError::Skipped(format!("channel {channel_id}: {e}")))?;

    if !response.is_success() {
        return Err(AppError::Skipped(format!(
            "channel {channel_id}: HTTP {}",
            response.status
        )));
    }

    let channel: ApiChannel = response
        .json()
        .map_err(|e| AppError::Skipped(format!("channel {channel_id}: {e}")))?;
    Ok(channel.into())
}

/// Walk every link in order and gather the resulting thread records.
///
/// Links are handled strictly one after another.
pub async fn collect<T: ApiTransport, R: ExportReporter>(
    transport: &T,
    urls: &[String],
    aggregator: &Aggregator<T>,
    reporter: &R,
) -> Result<Vec<ThreadRecord>, AppError> {
    let mut records = Vec::new();
    let total = urls.len();

    for (index, url) in urls.iter().enumerate() {
        reporter.report(ExportEvent::LinkStarted {
            index: index + 1,
            total,
            url,
        });

        let Some(reference) = reference::parse(url) else {
            reporter.report(ExportEvent::LinkSkipped {
                url,
                reason: "no /channels/<community>/<channel> path",
            });
            continue;
        };

        match fetch_channel_info(transport, &reference.channel_id).await {
            Ok(channel) => {
                reporter.report(ExportEvent::ChannelResolved { channel: &channel });
                records.extend(aggregator.channel(&reference, &channel, reporter).await?);
            }
            Err(AppError::Skipped(reason)) => {
                reporter.report(ExportEvent::LinkSkipped {
                    url,
                    reason: &reason,
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(records)
}

/// Run a full export and write the output file into `export_dir`.
///
/// Fails with [`AppError::NoData`] when no message matched anywhere.
pub async fn run_export<T: ApiTransport, R: ExportReporter>(
    transport: &T,
    request: &ExportRequest,
    pacing: Pacing,
    export_dir: &Path,
    file_stem: &str,
    reporter: &R,
) -> Result<ExportResult, AppError> {
    let aggregator = Aggregator::new(transport.clone(), request.window, pacing);
    let records = collect(transport, &request.urls, &aggregator, reporter).await?;

    if records.is_empty() {
        return Err(AppError::NoData);
    }

    let total_message_count: usize = records.iter().map(|r| r.messages.len()).sum();
    reporter.report(ExportEvent::WritingOutput {
        format: request.format,
        threads: records.len(),
        messages: total_message_count,
    });

    let path = export::write_export(
        export_dir,
        file_stem,
        request.format,
        &records,
        total_message_count,
    )?;
    let output_path = path.to_string_lossy().into_owned();

    reporter.report(ExportEvent::Finished {
        output_path: &output_path,
        messages: total_message_count,
    });

    Ok(ExportResult {
        thread_records: records,
        total_message_count,
        output_path,
    })
}
