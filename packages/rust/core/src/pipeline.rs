//! End-to-end pipeline: catalog → worklist → crawl → reconcile → summary.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use bountyscout_crawler::{CrawlObserver, Orchestrator, PageRenderer};
use bountyscout_discovery::{CatalogClient, build_worklist, novel_records};
use bountyscout_shared::{
    AppConfig, CrawlConfig, ExtractionResult, PathsConfig, Result, ScoutError, Slug, WorkItem,
};
use bountyscout_storage::{
    CheckpointJournal, ProcessedSet, load_dataset, read_json, save_dataset, write_json_atomic,
};

use crate::reconcile::{self, PrizeResultsDocument, PrizeUpdate, UpsertStats};
use crate::summary::{RunSummary, StatusReport, Tally};

/// Configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Resolved application config (paths, catalog endpoint).
    pub app: AppConfig,
    /// Runtime crawl settings, after CLI overrides.
    pub crawl: CrawlConfig,
    /// Crawl at most this many new records.
    pub limit: Option<usize>,
}

impl PipelineConfig {
    pub fn new(app: AppConfig) -> Self {
        Self {
            crawl: CrawlConfig::from(&app),
            app,
            limit: None,
        }
    }

    fn paths(&self) -> &PathsConfig {
        &self.app.paths
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the crawl knows how many items it will fetch.
    fn crawl_started(&self, pending: usize);
    /// Called after each item's result is persisted.
    fn item_finished(&self, result: &ExtractionResult);
    /// Called when the pipeline completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn crawl_started(&self, _pending: usize) {}
    fn item_finished(&self, _result: &ExtractionResult) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Discover new catalog records, crawl them, and fold the results into the
/// dataset.
///
/// 1. Fetch the catalog and drop already-processed slugs
/// 2. Build the worklist (honouring `limit`)
/// 3. Crawl with checkpointing
/// 4. Reconcile the dataset, then mark the crawled slugs processed
/// 5. Write the run summary
#[instrument(skip_all, fields(listings_url = %config.app.catalog.listings_url))]
pub async fn run_pipeline(
    config: &PipelineConfig,
    renderer: Arc<dyn PageRenderer>,
    cancel: &CancellationToken,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let run_id = Uuid::now_v7();
    let started_at = Utc::now();
    let paths = config.paths();

    // --- Phase 1: Discovery ---
    progress.phase("Fetching catalog");
    let processed = ProcessedSet::load(paths.processed_file());
    let client = CatalogClient::new(&config.app.catalog)?;
    let records = client.list_records().await?;
    let catalog_size = records.len();

    let mut novel = novel_records(records, processed.slugs());
    if let Some(limit) = config.limit {
        novel.truncate(limit);
    }
    write_json_atomic(&paths.catalog_snapshot_file(), &novel)?;

    info!(
        %run_id,
        catalog = catalog_size,
        processed = processed.len(),
        new = novel.len(),
        "catalog discovered"
    );

    let worklist = build_worklist(&novel, &config.app.catalog.listing_base_url)?;
    if worklist.is_empty() {
        let summary = RunSummary::empty(run_id, started_at);
        summary.write(&paths.summary_file())?;
        progress.done(&summary);
        info!("no new records, nothing to crawl");
        return Ok(summary);
    }

    // --- Phases 2-4 ---
    crawl_and_reconcile(config, run_id, started_at, &worklist, renderer, cancel, progress).await
}

/// Crawl an explicit worklist and fold the results into the dataset.
#[instrument(skip_all, fields(items = worklist.len()))]
pub async fn crawl_worklist(
    config: &PipelineConfig,
    worklist: &[WorkItem],
    renderer: Arc<dyn PageRenderer>,
    cancel: &CancellationToken,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let worklist = match config.limit {
        Some(limit) => &worklist[..limit.min(worklist.len())],
        None => worklist,
    };
    crawl_and_reconcile(config, Uuid::now_v7(), Utc::now(), worklist, renderer, cancel, progress)
        .await
}

async fn crawl_and_reconcile(
    config: &PipelineConfig,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    worklist: &[WorkItem],
    renderer: Arc<dyn PageRenderer>,
    cancel: &CancellationToken,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let paths = config.paths();

    // --- Crawl ---
    progress.phase("Crawling listing pages");
    let orchestrator = Orchestrator::new(config.crawl.clone(), renderer, paths.checkpoint_file());
    let observer = PipelineCrawlObserver { inner: progress };
    let state = orchestrator.run(worklist, cancel, &observer).await?;

    let in_run: HashSet<&Slug> = worklist.iter().map(|item| &item.slug).collect();
    let run_results: Vec<&ExtractionResult> = state
        .results()
        .iter()
        .filter(|r| in_run.contains(&r.slug))
        .collect();

    // --- Reconcile ---
    progress.phase("Reconciling dataset");
    reconcile_dataset(paths, state.results())?;

    if !run_results.is_empty() {
        let document = PrizeResultsDocument::from_results(run_results.iter().copied());
        let results_path = paths.prize_results_file(document.timestamp.timestamp());
        write_json_atomic(&results_path, &document)?;
        info!(path = %results_path.display(), "prize results written");
    }

    let mut processed = ProcessedSet::load(paths.processed_file());
    let added = processed.extend(run_results.iter().map(|r| r.slug.clone()));
    processed.save()?;

    // --- Summary ---
    let summary = RunSummary {
        run_id,
        started_at,
        finished_at: Utc::now(),
        new_records: worklist.len(),
        cancelled: cancel.is_cancelled(),
        tally: Tally::from_results(run_results.iter().copied()),
    };
    summary.write(&paths.summary_file())?;
    progress.done(&summary);

    if summary.cancelled {
        warn!(
            completed = summary.tally.total,
            remaining = worklist.len().saturating_sub(summary.tally.total),
            "run cancelled, partial results kept"
        );
    }
    info!(
        %run_id,
        crawled = summary.tally.total,
        degraded = summary.tally.degraded,
        newly_processed = added,
        "pipeline complete"
    );

    Ok(summary)
}

/// Upsert description records for `results` and merge their prize data into
/// the dataset file.
#[instrument(skip_all, fields(results = results.len()))]
pub fn reconcile_dataset(paths: &PathsConfig, results: &[ExtractionResult]) -> Result<UpsertStats> {
    let path = paths.dataset_file();
    let mut dataset = load_dataset(&path)?;

    let stats = reconcile::upsert_descriptions(&mut dataset, results);
    let updates: Vec<PrizeUpdate> = results.iter().map(PrizeUpdate::from).collect();
    let merged = reconcile::merge(&dataset, &updates);
    save_dataset(&path, &merged)?;

    info!(
        records = merged.len(),
        inserted = stats.inserted,
        updated = stats.updated,
        "dataset reconciled"
    );
    Ok(stats)
}

/// Outcome of [`merge_results_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    /// Records in the dataset.
    pub records: usize,
    /// Records that received prize data from the document.
    pub matched: usize,
}

/// Merge a prize results document into the dataset file.
#[instrument(skip_all, fields(results = %results_path.display()))]
pub fn merge_results_file(paths: &PathsConfig, results_path: &Path) -> Result<MergeReport> {
    let document: PrizeResultsDocument = read_json(results_path)?.ok_or_else(|| {
        ScoutError::validation(format!("results file not found: {}", results_path.display()))
    })?;

    let path = paths.dataset_file();
    let dataset = load_dataset(&path)?;
    let merged = reconcile::merge(&dataset, &document.results);

    let incoming: HashSet<&Slug> = document.results.iter().map(|u| &u.slug).collect();
    let matched = merged.iter().filter(|r| incoming.contains(&r.slug)).count();
    save_dataset(&path, &merged)?;

    if matched < incoming.len() {
        warn!(
            unmatched = incoming.len() - matched,
            "some results have no record in the dataset"
        );
    }
    info!(records = merged.len(), matched, "results merged");

    Ok(MergeReport {
        records: merged.len(),
        matched,
    })
}

/// Summarize the persisted checkpoint, processed set and dataset.
pub fn status(paths: &PathsConfig) -> Result<StatusReport> {
    let journal = CheckpointJournal::open(paths.checkpoint_file());
    let processed = ProcessedSet::load(paths.processed_file());
    let dataset = load_dataset(&paths.dataset_file())?;

    Ok(StatusReport {
        processed: processed.len(),
        dataset_records: dataset.len(),
        checkpoint: Tally::from_results(journal.state().results()),
    })
}

// ---------------------------------------------------------------------------
// Crawl progress adapter
// ---------------------------------------------------------------------------

/// Adapts a `ProgressReporter` to the crawler's `CrawlObserver` interface.
struct PipelineCrawlObserver<'a> {
    inner: &'a dyn ProgressReporter,
}

impl CrawlObserver for PipelineCrawlObserver<'_> {
    fn started(&self, pending: usize) {
        self.inner.crawl_started(pending);
    }

    fn item_finished(&self, result: &ExtractionResult) {
        self.inner.item_finished(result);
    }
}
