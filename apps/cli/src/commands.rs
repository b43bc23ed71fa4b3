//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use bountyscout_core::{PipelineConfig, ProgressReporter, RunSummary};
use bountyscout_crawler::{HttpRenderer, PageRenderer};
use bountyscout_shared::{
    AppConfig, ExtractionResult, config_file_path, init_config, load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// BountyScout: incremental bounty listing crawler.
#[derive(Parser)]
#[command(
    name = "bountyscout",
    version,
    about = "Discover new bounty listings, extract descriptions and prize tables, and keep a merged dataset.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.bountyscout/bountyscout.toml).
    #[arg(long, global = true, env = "BOUNTYSCOUT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Crawl overrides shared by `run` and `crawl`.
#[derive(clap::Args, Debug, Clone, Default)]
pub(crate) struct CrawlArgs {
    /// Pages processed at once (overrides `crawl.concurrency`).
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Per-worker delay between items in ms (overrides `crawl.min_delay_ms`).
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Crawl at most this many items.
    #[arg(long)]
    pub limit: Option<usize>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Discover new listings, crawl them, and update the dataset.
    Run {
        #[command(flatten)]
        crawl: CrawlArgs,
    },

    /// Crawl an explicit worklist file and update the dataset.
    Crawl {
        /// JSON array of `{slug, url?}` entries or catalog records.
        #[arg(long)]
        worklist: PathBuf,

        #[command(flatten)]
        crawl: CrawlArgs,
    },

    /// Merge a prize results document into the dataset.
    Merge {
        /// Path to a `prize_extraction_results_*.json` file.
        #[arg(long)]
        results: PathBuf,
    },

    /// Summarize the checkpoint, processed set, and dataset.
    Status {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "bountyscout=info",
        1 => "bountyscout=debug",
        _ => "bountyscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run { crawl } => cmd_run(config_path, &crawl).await,
        Command::Crawl { worklist, crawl } => cmd_crawl(config_path, &worklist, &crawl).await,
        Command::Merge { results } => cmd_merge(config_path, &results),
        Command::Status { json } => cmd_status(config_path, json),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

fn pipeline_config(app: AppConfig, args: &CrawlArgs) -> PipelineConfig {
    let mut config = PipelineConfig::new(app);
    if let Some(concurrency) = args.concurrency {
        config.crawl = config.crawl.with_concurrency(concurrency);
    }
    if let Some(delay_ms) = args.delay_ms {
        config.crawl = config.crawl.with_min_delay(Duration::from_millis(delay_ms));
    }
    config.limit = args.limit;
    config
}

fn renderer(config: &PipelineConfig) -> Result<Arc<dyn PageRenderer>> {
    let renderer = HttpRenderer::new(&config.crawl.user_agent, config.crawl.navigation_timeout)?;
    Ok(Arc::new(renderer))
}

/// A token cancelled on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight items");
            token.cancel();
        }
    });
    cancel
}

async fn cmd_run(config_path: Option<&Path>, args: &CrawlArgs) -> Result<()> {
    let config = pipeline_config(resolve_config(config_path)?, args);
    info!(
        concurrency = config.crawl.concurrency,
        delay_ms = config.crawl.min_delay.as_millis() as u64,
        limit = ?config.limit,
        "starting run"
    );

    let reporter = CliProgress::new();
    let summary = bountyscout_core::run_pipeline(
        &config,
        renderer(&config)?,
        &cancel_on_ctrl_c(),
        &reporter,
    )
    .await?;

    print_summary(&summary, &config);
    Ok(())
}

async fn cmd_crawl(config_path: Option<&Path>, worklist: &Path, args: &CrawlArgs) -> Result<()> {
    let config = pipeline_config(resolve_config(config_path)?, args);
    let items = bountyscout_discovery::read_worklist(worklist, &config.app.catalog.listing_base_url)?;
    if items.is_empty() {
        return Err(eyre!("worklist '{}' has no usable entries", worklist.display()));
    }
    info!(items = items.len(), worklist = %worklist.display(), "crawling worklist");

    let reporter = CliProgress::new();
    let summary = bountyscout_core::crawl_worklist(
        &config,
        &items,
        renderer(&config)?,
        &cancel_on_ctrl_c(),
        &reporter,
    )
    .await?;

    print_summary(&summary, &config);
    Ok(())
}

fn cmd_merge(config_path: Option<&Path>, results: &Path) -> Result<()> {
    let config = resolve_config(config_path)?;
    let report = bountyscout_core::merge_results_file(&config.paths, results)?;

    println!();
    println!("  Results merged into {}", config.paths.dataset_file().display());
    println!("  Text export: {}", config.paths.dataset_text_file().display());
    println!("  Records: {}", report.records);
    println!("  Matched: {}", report.matched);
    println!();
    Ok(())
}

fn cmd_status(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = resolve_config(config_path)?;
    let report = bountyscout_core::status(&config.paths)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!("  Checkpoint: {}", config.paths.checkpoint_file().display());
        print!("{report}");
        println!();
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, config: &PipelineConfig) {
    println!();
    print!("{summary}");
    println!("  Dataset:            {}", config.app.paths.dataset_file().display());
    println!("  Text export:        {}", config.app.paths.dataset_text_file().display());
    println!("  Summary:            {}", config.app.paths.summary_file().display());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter: a spinner per phase, a bar while crawling.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn crawl_started(&self, pending: usize) {
        self.bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("=> "),
        );
        self.bar.set_length(pending as u64);
        self.bar.set_position(0);
    }

    fn item_finished(&self, result: &ExtractionResult) {
        self.bar.inc(1);
        let marker = if result.is_degraded() { "degraded" } else { "ok" };
        self.bar.set_message(format!("{} ({marker})", result.slug));
    }

    fn done(&self, _summary: &RunSummary) {
        self.bar.finish_and_clear();
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config: AppConfig = resolve_config(config_path)?;
    match config_path {
        Some(path) => println!("# {}", path.display()),
        None => println!("# {}", config_file_path()?.display()),
    }
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
