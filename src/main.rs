//! clanker-scout command line entry point.
//!
//! `check` runs one discovery pass over the launch page; `recent` re-evaluates
//! tokens stored in a lookback window and summarizes them into themes.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use clanker_scout::scout::{
    report, AnnouncedSet, AnthropicSummarizer, ChromiumRenderer, Collaborators, HtmlFileRenderer,
    LogNotifier, NeynarClient, PageRenderer, RunReport, ScoutBuilder, ScoutConfig, ScoutPipeline,
    SqliteTokenStore, ThemeReducer,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clanker-scout", version, about = "Discover and announce new Clanker tokens")]
struct Cli {
    /// Launch page to scan
    #[arg(long, global = true, env = "CLANKER_URL")]
    url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the launch page once
    Check(CheckArgs),
    /// Re-evaluate recently stored tokens and summarize them into themes
    Recent(RecentArgs),
}

#[derive(Args, Default)]
struct CheckArgs {
    /// Write the JSON run report here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Debug logging; with --output also dumps the rendered HTML
    #[arg(short, long)]
    verbose: bool,

    /// Decide without notifying, publishing or recording announcements
    #[arg(long)]
    dry_run: bool,

    /// Parse a saved HTML page instead of launching the browser
    #[arg(long)]
    from_html: Option<PathBuf>,
}

#[derive(Args)]
struct RecentArgs {
    /// Lookback window in hours
    #[arg(long, default_value_t = 1)]
    hours: u32,

    #[arg(long)]
    dry_run: bool,

    /// Number of themes to show
    #[arg(long, default_value_t = 3)]
    themes: usize,
}

/// Log level when `RUST_LOG` is unset. Dry-run keeps everything below `warn`
/// off the console so only decision outcomes are printed.
fn default_level(verbose: bool, dry_run: bool) -> &'static str {
    if dry_run {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    }
}

fn init_tracing(verbose: bool, dry_run: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose, dry_run)));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn build_pipeline(config: ScoutConfig, renderer: Arc<dyn PageRenderer>) -> Result<ScoutPipeline> {
    let neynar = Arc::new(NeynarClient::new(&config.neynar)?);
    let storage = SqliteTokenStore::open(&config.database_path).await?;
    let announced = AnnouncedSet::load(&config.announced_path)?;

    let parts = Collaborators {
        renderer,
        lookup: neynar.clone(),
        publisher: neynar,
        notifier: Arc::new(LogNotifier),
        storage,
    };
    ScoutBuilder::from_config(config).build(parts, announced)
}

fn print_outcome(run: &RunReport, dry_run: bool) {
    if !dry_run {
        print!("{}", report::render_table(run));
        return;
    }
    for token in &run.tokens {
        println!(
            "{:?}: {} ({})",
            token.decision,
            token.enriched.token.symbol_or_unknown(),
            token.enriched.token.address_or_unknown()
        );
    }
}

async fn check(config: ScoutConfig, args: CheckArgs) -> Result<()> {
    let renderer: Arc<dyn PageRenderer> = match &args.from_html {
        Some(path) => Arc::new(HtmlFileRenderer::new(path)),
        None => Arc::new(ChromiumRenderer::new(&config)),
    };
    let mut pipeline = build_pipeline(config, renderer).await?;
    let output = pipeline.run_check().await?;

    if let Some(path) = &args.output {
        report::write_json(&output.report, path)?;
        info!("Results saved to {}", path.display());
        if args.verbose {
            let html_path = report::html_dump_path(path);
            std::fs::write(&html_path, &output.html)
                .with_context(|| format!("Failed to write {}", html_path.display()))?;
            info!("Debug HTML saved to {}", html_path.display());
        }
    }

    print_outcome(&output.report, args.dry_run);
    Ok(())
}

/// Start of a lookback window of `hours` ending at `now`.
fn lookback_start(now: DateTime<Utc>, hours: u32) -> Result<DateTime<Utc>> {
    Duration::try_hours(i64::from(hours))
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| anyhow!("Lookback of {hours} hours is out of range"))
}

async fn recent(mut config: ScoutConfig, args: RecentArgs) -> Result<()> {
    config.top_themes = args.themes;
    let since = lookback_start(Utc::now(), args.hours)?;
    let summarizer = AnthropicSummarizer::from_config(&config.summarizer)?;
    let top_themes = config.top_themes;

    // The browser is only launched by `render`, which `run_recent` never calls.
    let renderer = Arc::new(ChromiumRenderer::new(&config));
    let mut pipeline = build_pipeline(config, renderer).await?;
    let run = pipeline.run_recent(since).await?;
    print_outcome(&run, args.dry_run);

    let Some(summarizer) = summarizer else {
        info!("ANTHROPIC_API_KEY not set, skipping theme summary");
        return Ok(());
    };
    let reducer = ThemeReducer::new(pipeline.storage(), Arc::new(summarizer));
    match reducer.reduce_since(since, top_themes, !args.dry_run).await {
        Ok(themes) if themes.is_empty() => println!("No themes found."),
        Ok(themes) => {
            println!("Top {} themes from the last {} hour(s):", themes.len(), args.hours);
            print!("{}", report::render_themes(&themes));
        }
        Err(e) => error!("Theme summary failed: {:#}", e),
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Command::Check(CheckArgs {
        verbose: true,
        ..Default::default()
    }));
    let (verbose, dry_run) = match &command {
        Command::Check(args) => (args.verbose, args.dry_run),
        Command::Recent(args) => (false, args.dry_run),
    };
    init_tracing(verbose, dry_run);

    let mut builder = ScoutBuilder::from_config(ScoutConfig::from_env()).with_dry_run(dry_run);
    if let Some(url) = cli.url {
        builder = builder.with_page_url(url);
    }
    let config = builder.build_config();

    let result = match command {
        Command::Check(args) => check(config, args).await,
        Command::Recent(args) => recent(config, args).await,
    };
    if let Err(e) = &result {
        error!("Run failed: {:#}", e);
    }
    result
}
