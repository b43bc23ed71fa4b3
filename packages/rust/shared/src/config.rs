//! Application configuration for BountyScout.
//!
//! User config lives at `~/.bountyscout/bountyscout.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoutError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "bountyscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".bountyscout";

/// Desktop browser user agent; listing pages serve reduced markup to bots.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching bountyscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where state and output files are written.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Catalog API settings.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Crawl politeness and timeouts.
    #[serde(default)]
    pub crawl: CrawlPoliciesConfig,
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory for discovery state (processed set, catalog snapshot).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory for the checkpoint, dataset, and run summaries.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "data".into()
}
fn default_output_dir() -> String {
    "output".into()
}

impl PathsConfig {
    pub fn checkpoint_file(&self) -> PathBuf {
        Path::new(&self.output_dir).join("scraping_progress.json")
    }

    pub fn dataset_file(&self) -> PathBuf {
        Path::new(&self.output_dir).join("bounty_descriptions.json")
    }

    /// Plain-text rendering of the dataset, rewritten with every save.
    pub fn dataset_text_file(&self) -> PathBuf {
        self.dataset_file().with_extension("txt")
    }

    pub fn summary_file(&self) -> PathBuf {
        Path::new(&self.output_dir).join("run_summary.json")
    }

    pub fn processed_file(&self) -> PathBuf {
        Path::new(&self.data_dir).join("processed_bounties.json")
    }

    pub fn catalog_snapshot_file(&self) -> PathBuf {
        Path::new(&self.data_dir).join("catalog_snapshot.json")
    }

    /// Per-run prize results document, stamped with a unix timestamp.
    pub fn prize_results_file(&self, unix_ts: i64) -> PathBuf {
        Path::new(&self.output_dir).join(format!("prize_extraction_results_{unix_ts}.json"))
    }
}

/// `[catalog]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Listing API endpoint returning a JSON array of records.
    #[serde(default = "default_listings_url")]
    pub listings_url: String,

    /// Base URL that a slug is appended to when a record has no URL.
    #[serde(default = "default_listing_base_url")]
    pub listing_base_url: String,

    /// HTTP timeout for the listing API.
    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            listings_url: default_listings_url(),
            listing_base_url: default_listing_base_url(),
            timeout_secs: default_catalog_timeout(),
        }
    }
}

fn default_listings_url() -> String {
    "https://earn.superteam.fun/api/listings".into()
}
fn default_listing_base_url() -> String {
    "https://earn.superteam.fun/listing/".into()
}
fn default_catalog_timeout() -> u64 {
    30
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlPoliciesConfig {
    /// Maximum pages fetched/extracted at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Minimum ms a worker waits after an item before its next fetch.
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,

    /// Upper bound on a single page navigation.
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,

    /// Wait after triggering "View More" affordances.
    #[serde(default = "default_settle")]
    pub settle_ms: u64,

    /// User-Agent sent with page requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CrawlPoliciesConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            min_delay_ms: default_min_delay(),
            navigation_timeout_ms: default_navigation_timeout(),
            settle_ms: default_settle(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_concurrency() -> u32 {
    2
}
fn default_min_delay() -> u64 {
    2000
}
fn default_navigation_timeout() -> u64 {
    30_000
}
fn default_settle() -> u64 {
    1000
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}

// ---------------------------------------------------------------------------
// Crawl config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum concurrent items (always ≥ 1).
    pub concurrency: usize,
    /// Per-worker delay between finishing one item and fetching the next.
    pub min_delay: Duration,
    /// Bound on page navigation.
    pub navigation_timeout: Duration,
    /// Wait after expanding collapsed content.
    pub settle_delay: Duration,
    /// User-Agent for page requests.
    pub user_agent: String,
}

impl CrawlConfig {
    /// Override concurrency; values below 1 are clamped to 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_min_delay(mut self, delay: Duration) -> Self {
        self.min_delay = delay;
        self
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: (config.crawl.concurrency as usize).max(1),
            min_delay: Duration::from_millis(config.crawl.min_delay_ms),
            navigation_timeout: Duration::from_millis(config.crawl.navigation_timeout_ms),
            settle_delay: Duration::from_millis(config.crawl.settle_ms),
            user_agent: config.crawl.user_agent.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.bountyscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| ScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.bountyscout/bountyscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ScoutError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| ScoutError::config(format!("failed to parse {}: {e}", path.display())))?;
    validate_config(&config)?;
    Ok(config)
}

/// Reject configs that cannot drive a run.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.crawl.concurrency == 0 {
        return Err(ScoutError::config("crawl.concurrency must be at least 1"));
    }
    url::Url::parse(&config.catalog.listings_url).map_err(|e| {
        ScoutError::config(format!(
            "catalog.listings_url '{}' is not a URL: {e}",
            config.catalog.listings_url
        ))
    })?;
    url::Url::parse(&config.catalog.listing_base_url).map_err(|e| {
        ScoutError::config(format!(
            "catalog.listing_base_url '{}' is not a URL: {e}",
            config.catalog.listing_base_url
        ))
    })?;
    Ok(())
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ScoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| ScoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ScoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
