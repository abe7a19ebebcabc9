//! Manga popularity CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use manga_popularity::api::{self, JikanClient, MalClient, OAuthClient};
use manga_popularity::{
    PipelineError, PipelineSettings, PopularityPipeline, StdConsole, TokenStore,
};
use shared::{Config, Credentials, LogConfig, OutputPaths};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Report file (overrides report.file_name)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Concurrent popularity lookups (overrides enrichment.workers)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Skip entries whose popularity lookup fails instead of aborting
    #[arg(long)]
    allow_partial: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // CLIENT_ID / CLIENT_SECRET may come from a .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if let Some(output) = &args.output {
        config.report.file_name = output.to_string_lossy().to_string();
    }
    if let Some(workers) = args.workers {
        config.enrichment.workers = workers;
    }
    if args.allow_partial {
        config.enrichment.allow_partial = true;
    }

    // Initialize logging
    shared::logging::init(LogConfig::from_config(
        &config,
        "manga-popularity",
        args.verbose,
    ))?;

    info!("Manga popularity starting");
    info!(config_file = %args.config.display(), "Loaded configuration");

    // Missing credentials fail here, before any network call
    let credentials = Credentials::from_env()
        .map_err(PipelineError::from)
        .context("Failed to read MyAnimeList client credentials")?;

    let paths = OutputPaths::from_current_dir().context("Failed to resolve working directory")?;
    let token_path = paths.token_file(&config);

    // Initialize API clients
    let http = api::http_client(&config.http)?;
    let oauth = OAuthClient::new(
        http.clone(),
        &config.oauth,
        credentials,
        TokenStore::new(&token_path),
    )
    .context("Failed to create OAuth client")?;
    let mal = MalClient::new(http.clone(), &config.mal_api.base_url)
        .context("Failed to create MyAnimeList client")?;
    let jikan = JikanClient::new(http, &config.jikan.base_url)
        .context("Failed to create Jikan client")?;

    let settings = PipelineSettings::from_config(&config, &paths);
    info!(
        token_file = %token_path.display(),
        report_file = %settings.report_path.display(),
        workers = settings.workers,
        policy = ?settings.failure_policy,
        "Output locations"
    );

    let mut pipeline = PopularityPipeline::new(oauth, mal, jikan, StdConsole, settings);

    let stats = match pipeline.run().await {
        Ok(stats) => stats,
        Err(e) => {
            error!(error = %e, "Pipeline aborted");
            return Err(e).context("Popularity pipeline failed");
        }
    };

    // Display final statistics
    info!("=== Report Complete ===");
    info!("User: {}", stats.username);
    info!("Entries listed: {}", stats.listed);
    info!("Entries enriched: {}", stats.enriched);
    info!("Entries skipped: {}", stats.skipped);
    info!("Unscored entries dropped: {}", stats.unscored);
    info!("Rows written: {}", stats.reported);
    info!("Report file: {}", stats.report_path.display());

    info!("=== Rows by Reading Status ===");
    for (status, count) in &stats.by_status {
        info!("{}: {}", status, count);
    }

    info!("Manga popularity finished successfully");

    Ok(())
}
