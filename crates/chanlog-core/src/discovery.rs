//! Thread discovery for forum channels.
//!
//! Active threads come from one listing; archived threads are paged with a
//! `before` cursor taken from the archive timestamp of the last thread seen.
//! The remote API keeps the two listings disjoint, so results are simply
//! concatenated.

use crate::error::AppError;
use crate::models::{ApiThreadList, ThreadSummary};
use crate::traits::ApiTransport;

pub const ARCHIVED_PAGE_SIZE: usize = 100;

/// List every thread of a forum channel, active ones first.
///
/// A failed or non-success archived page ends discovery but keeps what was
/// already collected.
pub async fn discover<T: ApiTransport>(
    transport: &T,
    channel_id: &str,
) -> Result<Vec<ThreadSummary>, AppError> {
    let mut threads = active_threads(transport, channel_id).await?;
    let active = threads.len();

    let path = format!("/channels/{channel_id}/threads/archived/public");
    let mut before: Option<String> = None;

    loop {
        let mut query = vec![("limit", ARCHIVED_PAGE_SIZE.to_string())];
        if let Some(cursor) = &before {
            query.push(("before", cursor.clone()));
        }

        let response = match transport.get(&path, &query).await {
            Ok(r) => r,
            Err(e) if e.is_transport() => {
                tracing::warn!(%channel_id, error = %e, "Archived thread listing interrupted");
                break;
            }
            Err(e) => return Err(e),
        };
        if !response.is_success() {
            tracing::debug!(%channel_id, status = response.status, "Archived thread listing ended");
            break;
        }

        let page: ApiThreadList = response.json()?;
        if page.threads.is_empty() {
            break;
        }

        let has_more = page.has_more;
        let summaries: Vec<ThreadSummary> =
            page.threads.into_iter().map(ThreadSummary::from).collect();
        let next_cursor = summaries.last().and_then(|t| t.archive_cursor.clone());
        threads.extend(summaries);

        if !has_more {
            break;
        }
        match next_cursor {
            Some(cursor) => before = Some(cursor),
            None => {
                tracing::warn!(%channel_id, "Archived thread without archive timestamp, stopping");
                break;
            }
        }
    }

    tracing::debug!(
        %channel_id,
        active,
        archived = threads.len() - active,
        "Discovered threads"
    );
    Ok(threads)
}

async fn active_threads<T: ApiTransport>(
    transport: &T,
    channel_id: &str,
) -> Result<Vec<ThreadSummary>, AppError> {
    let path = format!("/channels/{channel_id}/threads/active");
    match transport.get(&path, &[]).await {
        Ok(response) if response.is_success() => {
            let list: ApiThreadList = response.json()?;
            Ok(list.threads.into_iter().map(ThreadSummary::from).collect())
        }
        Ok(response) => {
            tracing::debug!(%channel_id, status = response.status, "No active thread listing");
            Ok(Vec::new())
        }
        Err(e) if e.is_transport() => {
            tracing::warn!(%channel_id, error = %e, "Active thread listing failed");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;

    const ACTIVE: &str = "/channels/100/threads/active";
    const ARCHIVED: &str = "/channels/100/threads/archived/public";

    fn archived_page(ids: &[&str], has_more: bool) -> serde_json::Value {
        let threads: Vec<_> = ids
            .iter()
            .map(|id| thread_json(id, &format!("thread {id}"), &format!("ts-{id}")))
            .collect();
        serde_json::json!({"threads": threads, "has_more": has_more})
    }

    #[tokio::test]
    async fn merges_active_and_archived() {
        let transport = MockTransport::new()
            .respond(
                ACTIVE,
                serde_json::json!({"threads": [thread_json("1", "live", "a")]}),
            )
            .respond(ARCHIVED, archived_page(&["2", "3"], true))
            .respond(ARCHIVED, archived_page(&["4"], false));

        let threads = discover(&transport, "100").await.unwrap();
        let ids: Vec<_> = threads.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);

        let calls = transport.calls_to(ARCHIVED);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].query_value("before"), None);
        assert_eq!(calls[0].query_value("limit"), Some("100"));
        assert_eq!(calls[1].query_value("before"), Some("ts-3"));
    }

    #[tokio::test]
    async fn has_more_false_stops_even_on_full_page() {
        let ids: Vec<String> = (0..100).map(|i| format!("{}", 1000 + i)).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let transport = MockTransport::new()
            .respond(ACTIVE, serde_json::json!({"threads": []}))
            .respond(ARCHIVED, archived_page(&id_refs, false))
            .respond(ARCHIVED, archived_page(&["9999"], false));

        let threads = discover(&transport, "100").await.unwrap();
        assert_eq!(threads.len(), 100);
        assert_eq!(transport.calls_to(ARCHIVED).len(), 1);
    }

    #[tokio::test]
    async fn empty_page_stops_even_with_has_more() {
        let transport = MockTransport::new()
            .respond(ACTIVE, serde_json::json!({"threads": []}))
            .respond(ARCHIVED, archived_page(&["2"], true))
            .respond(ARCHIVED, archived_page(&[], true))
            .respond(ARCHIVED, archived_page(&["3"], false));

        let threads = discover(&transport, "100").await.unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(transport.calls_to(ARCHIVED).len(), 2);
    }

    #[tokio::test]
    async fn error_page_keeps_partial_results() {
        let transport = MockTransport::new()
            .respond(
                ACTIVE,
                serde_json::json!({"threads": [thread_json("1", "live", "a")]}),
            )
            .respond(ARCHIVED, archived_page(&["2"], true))
            .respond_status(ARCHIVED, 403, serde_json::json!({"message": "Missing Access"}));

        let threads = discover(&transport, "100").await.unwrap();
        assert_eq!(threads.len(), 2);
    }

    #[tokio::test]
    async fn transport_failure_keeps_partial_results() {
        let transport = MockTransport::new()
            .respond(ACTIVE, serde_json::json!({"threads": []}))
            .respond(ARCHIVED, archived_page(&["2"], true))
            .fail(ARCHIVED, AppError::NetworkError("reset".into()));

        let threads = discover(&transport, "100").await.unwrap();
        assert_eq!(threads.len(), 1);
    }

    #[tokio::test]
    async fn missing_active_listing_is_not_fatal() {
        let transport =
            MockTransport::new().respond(ARCHIVED, archived_page(&["2", "3"], false));

        let threads = discover(&transport, "100").await.unwrap();
        assert_eq!(threads.len(), 2);
    }
}
