use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use chanlog_client::{DEFAULT_API_BASE, DiscordClient};
use chanlog_core::export::export_file_stem;
use chanlog_core::job::ExportRequest;
use chanlog_core::models::{ExportFormat, ExportResult};
use chanlog_core::pipeline::{self, TracingReporter};
use chanlog_core::reference;
use chanlog_core::throttle::Pacing;
use chanlog_core::traits::ApiTransport;

#[derive(Parser)]
#[command(name = "chanlog", version, about = "Export chat channels and forum threads")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export messages from one or more channel links into a file
    Export {
        /// Channel or forum links (https://discord.com/channels/<community>/<channel>)
        #[arg(required = true)]
        urls: Vec<String>,

        /// Inclusive start: YYYY-MM-DD or YYYY-MM-DDTHH:MM[:SS], UTC
        #[arg(long)]
        from: Option<String>,

        /// Inclusive end; a date-only value covers the whole day
        #[arg(long)]
        to: Option<String>,

        /// Output format: tabular (csv), text (txt) or markup (html)
        #[arg(short, long, default_value_t = ExportFormat::Tabular)]
        format: ExportFormat,

        /// Directory the export file is written to
        #[arg(short, long, env = "CHANLOG_EXPORT_DIR", default_value = "exports")]
        out_dir: PathBuf,

        /// Bot token used for every API request
        #[arg(long, env = "CHANLOG_BOT_TOKEN", hide_env_values = true)]
        token: String,

        /// REST API base URL
        #[arg(long, env = "CHANLOG_API_BASE", default_value = DEFAULT_API_BASE)]
        api_base: String,

        /// Pause between page requests and between forum threads
        #[arg(long, env = "CHANLOG_PAGE_DELAY_MS", default_value_t = 300)]
        page_delay_ms: u64,

        /// Give up after this many consecutive rate-limit answers (unbounded when unset)
        #[arg(long, env = "CHANLOG_MAX_RATE_LIMIT_RETRIES")]
        max_rate_limit_retries: Option<u32>,

        /// Print the result as JSON instead of a summary
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Show the community and channel ids parsed from links
    Resolve {
        /// Links to parse
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("chanlog=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            urls,
            from,
            to,
            format,
            out_dir,
            token,
            api_base,
            page_delay_ms,
            max_rate_limit_retries,
            json,
        } => {
            let client = DiscordClient::with_base_url(&token, &api_base)
                .context("Failed to create HTTP client")?
                .with_max_rate_limit_retries(max_rate_limit_retries);
            let request = ExportRequest::new(urls, from.as_deref(), to.as_deref(), format)?;
            let pacing = Pacing::new(Duration::from_millis(page_delay_ms));

            let result = cmd_export(&client, &request, pacing, &out_dir).await?;
            print_result(&result, json)?;
        }
        Commands::Resolve { urls } => cmd_resolve(&urls)?,
    }

    Ok(())
}

async fn cmd_export<T: ApiTransport>(
    client: &T,
    request: &ExportRequest,
    pacing: Pacing,
    out_dir: &Path,
) -> Result<ExportResult> {
    if !client.has_credential() {
        bail!("A bot token is required (--token or CHANLOG_BOT_TOKEN)");
    }

    let stem = export_file_stem(Uuid::new_v4(), Utc::now());
    tracing::info!(
        links = request.urls.len(),
        format = %request.format,
        out_dir = %out_dir.display(),
        "Starting export"
    );

    pipeline::run_export(client, request, pacing, out_dir, &stem, &TracingReporter)
        .await
        .map_err(|e| anyhow::anyhow!(e))
}

fn print_result(result: &ExportResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    for record in &result.thread_records {
        println!(
            "  {} ({}): {} messages",
            record.title,
            record.created_at.format("%Y-%m-%d %H:%M UTC"),
            record.messages.len()
        );
    }
    println!(
        "\n{} threads, {} messages written to {}",
        result.thread_count(),
        result.total_message_count,
        result.output_path
    );
    Ok(())
}

/// Tab-separated `url, community, channel` rows; unparseable links get empty ids.
fn cmd_resolve(urls: &[String]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(std::io::stdout());
    writer.write_record(["url", "community", "channel"])?;

    let mut unresolved = 0;
    for url in urls {
        match reference::parse(url) {
            Some(r) => writer.write_record([url.as_str(), r.community_segment(), r.channel_id.as_str()])?,
            None => {
                unresolved += 1;
                tracing::warn!(%url, "No /channels/<community>/<channel> path in link");
                writer.write_record([url.as_str(), "", ""])?;
            }
        }
    }
    writer.flush().context("Failed to write to stdout")?;

    if unresolved > 0 {
        tracing::warn!(unresolved, "Some links would be skipped by an export");
    }
    Ok(())
}
