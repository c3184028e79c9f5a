use std::path::PathBuf;
use std::time::Duration;

use chanlog_client::DEFAULT_API_BASE;
use chanlog_core::AppError;
use chanlog_core::throttle::Pacing;

/// Server settings read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub export_dir: PathBuf,
    pub api_base: String,
    pub bot_token: Option<String>,
    pub page_delay: Duration,
    pub max_rate_limit_retries: Option<u32>,
}

impl ServerConfig {
    /// Read configuration from environment variables.
    ///
    /// - `CHANLOG_BOT_TOKEN` (optional; exports are rejected without it)
    /// - `CHANLOG_API_BASE` (optional, defaults to the public v9 API)
    /// - `CHANLOG_EXPORT_DIR` (optional, defaults to `exports`)
    /// - `CHANLOG_SERVER_PORT` (optional, defaults to 3000)
    /// - `CHANLOG_PAGE_DELAY_MS` (optional, defaults to 300)
    /// - `CHANLOG_MAX_RATE_LIMIT_RETRIES` (optional, unbounded when unset)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("CHANLOG_SERVER_PORT") {
            None => 3000,
            Some(raw) => raw.trim().parse().map_err(|_| {
                AppError::ConfigError(format!(
                    "Invalid CHANLOG_SERVER_PORT '{raw}': must be a port number"
                ))
            })?,
        };

        let page_delay_ms: u64 = match var("CHANLOG_PAGE_DELAY_MS") {
            None => 300,
            Some(raw) => raw.trim().parse().map_err(|_| {
                AppError::ConfigError(format!(
                    "Invalid CHANLOG_PAGE_DELAY_MS '{raw}': must be a non-negative integer"
                ))
            })?,
        };

        let max_rate_limit_retries = var("CHANLOG_MAX_RATE_LIMIT_RETRIES")
            .map(|raw| {
                raw.trim().parse::<u32>().map_err(|_| {
                    AppError::ConfigError(format!(
                        "Invalid CHANLOG_MAX_RATE_LIMIT_RETRIES '{raw}': must be a non-negative integer"
                    ))
                })
            })
            .transpose()?;

        Ok(Self {
            port,
            export_dir: var("CHANLOG_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("exports")),
            api_base: var("CHANLOG_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            bot_token: var("CHANLOG_BOT_TOKEN").map(|t| t.trim().to_string()),
            page_delay: Duration::from_millis(page_delay_ms),
            max_rate_limit_retries,
        })
    }

    pub fn pacing(&self) -> Pacing {
        Pacing::new(self.page_delay)
    }
}
