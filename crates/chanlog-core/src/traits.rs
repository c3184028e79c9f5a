use std::future::Future;

use serde::de::DeserializeOwned;

use crate::error::AppError;

/// A response from the remote API with its status preserved.
///
/// Non-success statuses are not errors at this layer: callers decide whether
/// a missing resource is fatal or merely ends a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: serde_json::Value) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body into a typed payload.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

/// Authenticated GET access to the remote chat API.
pub trait ApiTransport: Send + Sync + Clone + 'static {
    /// Issue a GET for `path` (relative to the API base) with query pairs.
    ///
    /// Rate-limit responses are retried inside the implementation; network
    /// failures are returned as transport errors.
    fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> impl Future<Output = Result<ApiResponse, AppError>> + Send;

    /// Whether a credential is configured for outgoing requests.
    fn has_credential(&self) -> bool {
        true
    }
}
