//! Test utilities: a routed mock transport and payload builders.
//!
//! Handwritten mocks for dependency injection in unit tests. State lives in
//! `Arc<Mutex<_>>` so clones share recorded calls and queued responses.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::snowflake::PLATFORM_EPOCH_MS;
use crate::traits::{ApiResponse, ApiTransport};

/// A recorded GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl RecordedCall {
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// Mock transport answering from per-path response queues.
///
/// Each call to a path pops the first queued response. A path with no
/// responses left answers 404, which ends any listing.
#[derive(Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<HashMap<String, Vec<Result<ApiResponse, AppError>>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    delay: Duration,
    credential: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            credential: true,
            ..Self::default()
        }
    }

    /// A transport that reports no configured credential.
    pub fn without_credential() -> Self {
        Self {
            credential: false,
            ..Self::default()
        }
    }

    /// Sleep before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue a 200 response with `body` for `path`.
    pub fn respond(self, path: &str, body: serde_json::Value) -> Self {
        self.push(path, Ok(ApiResponse::ok(body)))
    }

    /// Queue a response with an explicit status for `path`.
    pub fn respond_status(self, path: &str, status: u16, body: serde_json::Value) -> Self {
        self.push(path, Ok(ApiResponse::new(status, body)))
    }

    /// Queue a transport failure for `path`.
    pub fn fail(self, path: &str, error: AppError) -> Self {
        self.push(path, Err(error))
    }

    fn push(self, path: &str, response: Result<ApiResponse, AppError>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push(response);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.path == path)
            .collect()
    }
}

impl ApiTransport for MockTransport {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ApiResponse, AppError> {
        self.calls.lock().unwrap().push(RecordedCall {
            path: path.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(path) {
                Some(queue) if !queue.is_empty() => Some(queue.remove(0)),
                _ => None,
            }
        };

        next.unwrap_or_else(|| {
            Ok(ApiResponse::new(
                404,
                serde_json::json!({"message": "Unknown Channel", "code": 10003}),
            ))
        })
    }

    fn has_credential(&self) -> bool {
        self.credential
    }
}

// ---------------------------------------------------------------------------
// Payload builders
// ---------------------------------------------------------------------------

/// Build an identifier encoding `at` with sequence bits `seq`.
pub fn snowflake_at(at: DateTime<Utc>, seq: u64) -> String {
    let millis = (at.timestamp_millis() - PLATFORM_EPOCH_MS) as u64;
    ((millis << 22) | (seq & 0x3F_FFFF)).to_string()
}

pub fn channel_json(id: &str, kind: u8, name: &str) -> serde_json::Value {
    serde_json::json!({"id": id, "type": kind, "name": name})
}

pub fn thread_json(id: &str, name: &str, archive_timestamp: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "thread_metadata": {"archive_timestamp": archive_timestamp}
    })
}

pub fn message_json(id: &str, author: &str, content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "author": {"username": author},
        "content": content,
        "attachments": []
    })
}

/// A page of messages with the given ids, in the order given.
pub fn message_page(ids: &[String]) -> serde_json::Value {
    serde_json::Value::Array(
        ids.iter()
            .map(|id| message_json(id, "tester", &format!("message {id}")))
            .collect(),
    )
}

/// Descending ids for a page, newest first as the remote API returns them.
pub fn descending_ids(start: DateTime<Utc>, count: usize) -> Vec<String> {
    (0..count)
        .rev()
        .map(|i| snowflake_at(start + chrono::Duration::seconds(i as i64), 0))
        .collect()
}
