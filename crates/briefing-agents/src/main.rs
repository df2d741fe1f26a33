use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use briefing_agents::config::BriefingConfig;
use briefing_agents::llm::OpenAiChatClient;
use briefing_agents::orchestrator;
use briefing_agents::provider::ExaSearchClient;
use briefing_agents::queries;
use briefing_agents::SpecialistAgent;
use curation::{DayCache, JsonContentStore};

/// Run the morning-briefing search agents and print the merged report as JSON.
#[derive(Parser, Debug)]
#[command(name = "briefing-agents", version)]
struct Cli {
    /// Maximum refine/search rounds per agent.
    #[arg(long, default_value_t = 2)]
    max_iterations: u32,

    /// Ignore same-day cached results and re-run every agent.
    #[arg(long)]
    no_cache: bool,

    /// Run label recorded with persisted articles ("manual" or "automated").
    #[arg(long, default_value = "manual")]
    run_label: String,

    /// Directory for the content store and result cache (overrides
    /// BRIEFING_DATA_DIR).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Pretty-print the JSON report.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = BriefingConfig::from_env()?;
    config.run_label = cli.run_label;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let config = Arc::new(config);

    info!(
        provider = %config.provider.url,
        model = %config.llm.model,
        run_label = %config.run_label,
        "briefing orchestrator starting"
    );

    let provider = Arc::new(
        ExaSearchClient::new(config.provider.clone(), config.request_timeout)
            .context("failed to build search provider client")?,
    );
    let llm = Arc::new(
        OpenAiChatClient::new(config.llm.clone(), config.request_timeout)
            .context("failed to build chat-completion client")?,
    );
    let store = Arc::new(
        JsonContentStore::open(config.data_dir.join("content_store.json"))
            .context("failed to open content store")?,
    );
    let cache_dir = config.data_dir.join("agent_results");

    let agents: Vec<SpecialistAgent> = queries::default_specs()
        .into_iter()
        .map(|spec| {
            SpecialistAgent::new(
                spec,
                config.clone(),
                provider.clone(),
                llm.clone(),
                store.clone(),
                DayCache::new(&cache_dir),
            )
        })
        .collect();

    let report = orchestrator::run_all(agents, cli.max_iterations, !cli.no_cache).await;

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{rendered}");

    Ok(())
}
