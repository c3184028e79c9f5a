use crate::error::AppError;
use crate::models::{ApiMessage, RawMessage};
use crate::snowflake;
use crate::throttle::Pacing;
use crate::traits::ApiTransport;
use crate::window::DateWindow;

pub const MESSAGE_PAGE_SIZE: usize = 100;

/// Fetch every message of a channel or thread that falls inside `window`.
///
/// Pages are requested newest-first with `before=<oldest id of the previous
/// page>`. Out-of-window messages are dropped but paging continues until a
/// short page, a non-success response or a transport failure; in the last
/// two cases the messages gathered so far are returned.
///
/// The returned messages keep the remote order; sorting is the caller's job.
pub async fn page<T: ApiTransport>(
    transport: &T,
    channel_id: &str,
    window: &DateWindow,
    pacing: &Pacing,
) -> Result<Vec<RawMessage>, AppError> {
    let path = format!("/channels/{channel_id}/messages");
    let mut kept = Vec::new();
    let mut before: Option<String> = None;
    let mut pages = 0usize;
    let mut seen = 0usize;

    loop {
        if pages > 0 {
            pacing.between_pages().await;
        }

        let mut query = vec![("limit", MESSAGE_PAGE_SIZE.to_string())];
        if let Some(cursor) = &before {
            query.push(("before", cursor.clone()));
        }

        let response = match transport.get(&path, &query).await {
            Ok(r) => r,
            Err(e) if e.is_transport() => {
                tracing::warn!(
                    %channel_id,
                    error = %e,
                    kept = kept.len(),
                    "Message pagination interrupted, keeping partial results"
                );
                break;
            }
            Err(e) => return Err(e),
        };
        pages += 1;

        if !response.is_success() {
            tracing::debug!(%channel_id, status = response.status, "Message listing ended");
            break;
        }

        let batch: Vec<ApiMessage> = response.json()?;
        let batch_len = batch.len();
        seen += batch_len;

        // Messages arrive newest-first, so the last one is the next cursor.
        let oldest = batch.last().map(|m| m.id.clone());

        for message in batch {
            let at = snowflake::decode(&message.id)?;
            if window.contains(at) {
                kept.push(RawMessage::from(message));
            }
        }

        if batch_len < MESSAGE_PAGE_SIZE {
            break;
        }
        before = oldest;
    }

    tracing::debug!(%channel_id, pages, seen, kept = kept.len(), "Paged messages");
    Ok(kept)
}
