use chanlog_client::DiscordClient;
use chanlog_core::{JobConfig, JobManager};

use crate::config::ServerConfig;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub jobs: JobManager<DiscordClient>,
}

impl AppState {
    pub fn new(client: DiscordClient, config: JobConfig) -> Self {
        Self {
            jobs: JobManager::new(client, config),
        }
    }

    /// Build the client and job manager described by `config`.
    pub fn from_config(config: &ServerConfig) -> Result<Self, chanlog_core::AppError> {
        let client = DiscordClient::with_base_url(
            config.bot_token.as_deref().unwrap_or_default(),
            &config.api_base,
        )?
        .with_max_rate_limit_retries(config.max_rate_limit_retries);

        let job_config = JobConfig::default()
            .with_export_dir(&config.export_dir)
            .with_pacing(config.pacing());

        Ok(Self::new(client, job_config))
    }
}
