use chrono::{DateTime, Utc};

use crate::discovery;
use crate::error::AppError;
use crate::models::{ChannelInfo, ChannelKind, MessageRecord, RawMessage, ThreadRecord};
use crate::pager;
use crate::pipeline::{ExportEvent, ExportReporter};
use crate::reference::ChannelReference;
use crate::snowflake;
use crate::throttle::Pacing;
use crate::traits::ApiTransport;
use crate::window::DateWindow;

pub const PERMALINK_BASE: &str = "https://discord.com/channels";

/// Assembles thread records for one channel at a time.
///
/// Generic over the transport so tests can drive it with canned payloads.
pub struct Aggregator<T: ApiTransport> {
    transport: T,
    window: DateWindow,
    pacing: Pacing,
}

impl<T: ApiTransport> Aggregator<T> {
    pub fn new(transport: T, window: DateWindow, pacing: Pacing) -> Self {
        Self {
            transport,
            window,
            pacing,
        }
    }

    pub fn window(&self) -> &DateWindow {
        &self.window
    }

    /// Records for a channel, dispatched on its kind.
    pub async fn channel<R: ExportReporter>(
        &self,
        reference: &ChannelReference,
        channel: &ChannelInfo,
        reporter: &R,
    ) -> Result<Vec<ThreadRecord>, AppError> {
        match channel.kind {
            ChannelKind::Forum => self.forum(reference, channel, reporter).await,
            ChannelKind::Standard => Ok(self
                .standard(reference, channel, reporter)
                .await?
                .into_iter()
                .collect()),
        }
    }

    /// One record per forum thread created inside the window and holding at
    /// least one in-window message.
    pub async fn forum<R: ExportReporter>(
        &self,
        reference: &ChannelReference,
        channel: &ChannelInfo,
        reporter: &R,
    ) -> Result<Vec<ThreadRecord>, AppError> {
        let threads = discovery::discover(&self.transport, &channel.id).await?;
        reporter.report(ExportEvent::ThreadsDiscovered {
            channel_id: &channel.id,
            count: threads.len(),
        });

        let total = threads.len();
        let mut records = Vec::new();

        for (index, thread) in threads.iter().enumerate() {
            // A thread's first message cannot predate the thread, so a thread
            // created outside the window has nothing to contribute.
            let created_at = snowflake::decode(&thread.id)?;
            if !self.window.contains(created_at) {
                reporter.report(ExportEvent::ThreadOutOfWindow {
                    title: &thread.name,
                    created_at,
                });
                continue;
            }

            reporter.report(ExportEvent::ThreadStarted {
                index: index + 1,
                total,
                title: &thread.name,
            });

            let raw = pager::page(&self.transport, &thread.id, &self.window, &self.pacing).await?;
            let record = build_record(
                thread.name.clone(),
                created_at,
                raw,
                reference.community_segment(),
                &thread.id,
            )?;

            if let Some(record) = record {
                reporter.report(ExportEvent::ThreadCollected {
                    title: &record.title,
                    messages: record.messages.len(),
                });
                records.push(record);
            }

            self.pacing.between_threads().await;
        }

        Ok(records)
    }

    /// A single record for a flat channel, titled `#<name>`.
    pub async fn standard<R: ExportReporter>(
        &self,
        reference: &ChannelReference,
        channel: &ChannelInfo,
        reporter: &R,
    ) -> Result<Option<ThreadRecord>, AppError> {
        let raw = pager::page(&self.transport, &channel.id, &self.window, &self.pacing).await?;
        let created_at = snowflake::decode(&channel.id)?;
        let record = build_record(
            format!("#{}", channel.name),
            created_at,
            raw,
            reference.community_segment(),
            &channel.id,
        )?;

        if let Some(record) = &record {
            reporter.report(ExportEvent::ThreadCollected {
                title: &record.title,
                messages: record.messages.len(),
            });
        }
        Ok(record)
    }
}

/// Sort messages ascending by id and format them into a record.
///
/// Returns `None` when no message survived filtering.
pub fn build_record(
    title: String,
    created_at: DateTime<Utc>,
    messages: Vec<RawMessage>,
    community: &str,
    container_id: &str,
) -> Result<Option<ThreadRecord>, AppError> {
    if messages.is_empty() {
        return Ok(None);
    }

    let mut keyed = messages
        .into_iter()
        .map(|m| snowflake::parse_id(&m.id).map(|key| (key, m)))
        .collect::<Result<Vec<_>, _>>()?;
    keyed.sort_by_key(|(key, _)| *key);

    let messages = keyed
        .into_iter()
        .map(|(_, m)| to_record(m, community, container_id))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(ThreadRecord {
        title,
        created_at,
        messages,
    }))
}

fn to_record(
    message: RawMessage,
    community: &str,
    container_id: &str,
) -> Result<MessageRecord, AppError> {
    let occurred_at = snowflake::decode(&message.id)?;
    let permalink = format!("{PERMALINK_BASE}/{community}/{container_id}/{}", message.id);
    Ok(MessageRecord {
        author: message.author_name,
        occurred_at,
        content: message.content,
        attachments: message.attachment_urls.join("\n"),
        permalink,
        id: message.id,
    })
}
