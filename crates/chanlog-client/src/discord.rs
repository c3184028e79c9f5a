use std::time::Duration;

use chanlog_core::error::AppError;
use chanlog_core::traits::{ApiResponse, ApiTransport};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v9";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Authenticated client for the chat platform's REST API.
///
/// Every request carries `Authorization: Bot <token>`. A 429 answer is
/// retried after the delay the server asks for; by default there is no cap
/// on the number of retries.
#[derive(Clone)]
pub struct DiscordClient {
    client: Client,
    base_url: String,
    token: String,
    timeout_secs: u64,
    max_rate_limit_retries: Option<u32>,
}

impl DiscordClient {
    pub fn new(token: &str) -> Result<Self, AppError> {
        Self::with_base_url(token, DEFAULT_API_BASE)
    }

    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self, AppError> {
        Self::build(token, base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(self, timeout: Duration) -> Result<Self, AppError> {
        let max = self.max_rate_limit_retries;
        let mut client = Self::build(&self.token, &self.base_url, timeout)?;
        client.max_rate_limit_retries = max;
        Ok(client)
    }

    /// Give up with [`AppError::RateLimitExceeded`] after `max` consecutive
    /// rate-limit answers for the same request.
    pub fn with_max_rate_limit_retries(mut self, max: Option<u32>) -> Self {
        self.max_rate_limit_retries = max;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build(token: &str, base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("chanlog/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
            timeout_secs: timeout.as_secs(),
            max_rate_limit_retries: None,
        })
    }

    async fn send_once(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<(StatusCode, serde_json::Value), AppError> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bot {}", self.token))
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {e}"))
                } else {
                    AppError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))?;

        // Error pages are not always JSON; keep them as text.
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        Ok((status, body))
    }
}

#[derive(Deserialize)]
struct RateLimitBody {
    retry_after: Option<f64>,
}

/// Delay requested by a 429 body, falling back to one second.
fn retry_after(body: &serde_json::Value) -> Duration {
    serde_json::from_value::<RateLimitBody>(body.clone())
        .ok()
        .and_then(|b| b.retry_after)
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

impl ApiTransport for DiscordClient {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ApiResponse, AppError> {
        let url = format!("{}{}", self.base_url, path);
        let mut rate_limited = 0u32;

        loop {
            let (status, body) = self.send_once(&url, query).await?;

            if status != StatusCode::TOO_MANY_REQUESTS {
                if !status.is_success() {
                    tracing::debug!(%path, status = status.as_u16(), "Non-success response");
                }
                return Ok(ApiResponse::new(status.as_u16(), body));
            }

            rate_limited += 1;
            if let Some(max) = self.max_rate_limit_retries
                && rate_limited > max
            {
                return Err(AppError::RateLimitExceeded(max));
            }

            let wait = retry_after(&body);
            tracing::warn!(%path, wait_ms = wait.as_millis() as u64, attempt = rate_limited, "Rate limited, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    fn has_credential(&self) -> bool {
        !self.token.is_empty()
    }
}
