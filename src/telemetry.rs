// src/telemetry.rs
use metrics::describe_counter;
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "ai_news_agent=info,warn";

/// Install the global subscriber. `LOG_FORMAT=json` switches to JSON lines;
/// `RUST_LOG` overrides the default filter. Safe to call more than once.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// One-time metrics registration so series carry descriptions when a
/// recorder is installed by the embedding process.
pub fn describe_metrics() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "news_agent_runs_total",
            "Completed runs, labelled by outcome (updated | preserved)."
        );
        describe_counter!(
            "news_agent_stage_failures_total",
            "Runs that fell back, labelled by failing stage."
        );
        describe_counter!(
            "news_agent_notifications_total",
            "Notification attempts, labelled by result (sent | failed)."
        );
    });
}
