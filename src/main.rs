//! AI News Agent — binary entrypoint.
//! One run per invocation; the external scheduler decides the cadence.
//!
//! Exit status is 0 whether the page was updated or the run fell back.
//! Only startup problems (missing credentials, bad config) exit non-zero.

use std::path::PathBuf;

use ai_news_agent::{telemetry, Agent, AgentConfig, RunOptions};
use anyhow::Context;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "ai-news-agent", version, about = "Patch this month's AI research headline into the portfolio page")]
struct Cli {
    /// Settings file (defaults to $NEWS_AGENT_CONFIG, then config/agent.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Page to patch, overriding `document_path` from settings
    #[arg(long)]
    document: Option<PathBuf>,

    /// Resolve and patch in memory only; log the notification instead of sending it
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();

    telemetry::init_tracing();
    telemetry::describe_metrics();

    let cli = Cli::parse();

    // Fail fast before any network call.
    let config = AgentConfig::load(cli.config.as_deref()).context("loading configuration")?;
    tracing::info!(
        model = %config.settings.model,
        document = %cli.document.as_ref().unwrap_or(&config.settings.document_path).display(),
        key_len = config.credentials.openai_api_key.len(),
        dry_run = cli.dry_run,
        "configuration loaded"
    );

    let options = RunOptions {
        document: cli.document,
        dry_run: cli.dry_run,
    };
    let agent = Agent::from_config(&config, &options).context("building agent")?;

    let report = agent.run(chrono::Local::now()).await;
    if !report.succeeded() {
        tracing::info!("run finished on the fallback path; exiting cleanly");
    }
    Ok(())
}
