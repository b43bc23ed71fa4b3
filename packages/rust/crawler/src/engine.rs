//! Crawl orchestrator: bounded-concurrency, checkpointed, resumable.
//!
//! Each pending work item runs in its own task behind a semaphore. A task
//! holds its slot from navigation until its result is durably appended to
//! the checkpoint and the politeness delay has elapsed.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use bountyscout_normalizer as normalizer;
use bountyscout_shared::{
    CheckpointState, CrawlConfig, DEFAULT_TOKEN, ExtractionResult, Outcome, Provenance, Result,
    ScoutError, Slug, WorkItem,
};
use bountyscout_storage::CheckpointJournal;

use crate::page::{HtmlSnapshot, PageRenderer};
use crate::strategies::{FieldExtractor, ItemContext, extract_title};

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Notified as the crawl makes progress. Calls arrive on the orchestrating
/// task, never concurrently.
pub trait CrawlObserver: Send + Sync {
    /// Called once with the number of items about to be crawled.
    fn started(&self, _pending: usize) {}
    /// Called after each result has been persisted.
    fn item_finished(&self, _result: &ExtractionResult) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl CrawlObserver for NoopObserver {}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives a worklist through rendering and extraction.
pub struct Orchestrator {
    config: CrawlConfig,
    renderer: Arc<dyn PageRenderer>,
    extractor: Arc<FieldExtractor>,
    checkpoint_path: PathBuf,
}

/// State shared by every item task of one run.
struct RunShared {
    config: CrawlConfig,
    renderer: Arc<dyn PageRenderer>,
    extractor: Arc<FieldExtractor>,
    journal: Mutex<CheckpointJournal>,
    slots: Semaphore,
    abort: CancellationToken,
    /// Items not yet started.
    queued: AtomicUsize,
}

impl Orchestrator {
    pub fn new(
        config: CrawlConfig,
        renderer: Arc<dyn PageRenderer>,
        checkpoint_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            renderer,
            extractor: Arc::new(FieldExtractor::new()),
            checkpoint_path: checkpoint_path.into(),
        }
    }

    /// Replace the built-in field strategies.
    pub fn with_extractor(mut self, extractor: FieldExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawl every item of `worklist` not already in the checkpoint.
    ///
    /// Returns the checkpoint state after the run. Cancellation is not an
    /// error: in-flight items finish, queued ones are skipped, and the state
    /// so far is returned. A checkpoint write failure aborts the run.
    #[instrument(skip_all, fields(items = worklist.len(), concurrency = self.config.concurrency))]
    pub async fn run(
        &self,
        worklist: &[WorkItem],
        cancel: &CancellationToken,
        observer: &dyn CrawlObserver,
    ) -> Result<CheckpointState> {
        let journal = CheckpointJournal::open(&self.checkpoint_path);
        let pending = pending_items(worklist, journal.state());

        if pending.is_empty() {
            info!(completed = journal.state().len(), "nothing pending, checkpoint unchanged");
            return Ok(journal.into_state());
        }

        info!(
            pending = pending.len(),
            already_completed = journal.state().len(),
            "starting crawl"
        );
        observer.started(pending.len());

        let (finished_tx, mut finished_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(RunShared {
            config: self.config.clone(),
            renderer: self.renderer.clone(),
            extractor: self.extractor.clone(),
            journal: Mutex::new(journal),
            slots: Semaphore::new(self.config.concurrency.max(1)),
            abort: cancel.child_token(),
            queued: AtomicUsize::new(pending.len()),
        });

        let handles: Vec<_> = pending
            .into_iter()
            .map(|item| tokio::spawn(run_slot(item, shared.clone(), finished_tx.clone())))
            .collect();
        // The channel closes once the last task drops its sender.
        drop(finished_tx);

        let (mut succeeded, mut degraded) = (0usize, 0usize);
        while let Some(result) = finished_rx.recv().await {
            match result.outcome {
                Outcome::Success => succeeded += 1,
                Outcome::Degraded => degraded += 1,
            }
            observer.item_finished(&result);
        }

        let mut failure = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failure.get_or_insert(e);
                }
                Err(e) => {
                    error!(error = %e, "crawl task panicked");
                    failure.get_or_insert(ScoutError::Storage(format!("crawl task failed: {e}")));
                }
            }
        }
        if let Some(e) = failure {
            return Err(e);
        }

        let state = shared.journal.lock().await.state().clone();
        info!(
            succeeded,
            degraded,
            completed = state.len(),
            cancelled = cancel.is_cancelled(),
            "crawl finished"
        );
        Ok(state)
    }
}

/// Items not yet completed, first occurrence per slug, in worklist order.
pub fn pending_items(worklist: &[WorkItem], state: &CheckpointState) -> Vec<WorkItem> {
    let mut seen = std::collections::HashSet::<&Slug>::new();
    worklist
        .iter()
        .filter(|item| !state.is_completed(&item.slug) && seen.insert(&item.slug))
        .cloned()
        .collect()
}

/// One item's lifetime: wait for a slot, process, persist, cool down.
async fn run_slot(
    item: WorkItem,
    shared: Arc<RunShared>,
    finished: mpsc::UnboundedSender<ExtractionResult>,
) -> Result<()> {
    let _permit = tokio::select! {
        permit = shared.slots.acquire() => permit
            .map_err(|_| ScoutError::Storage("worker slots closed".into()))?,
        _ = shared.abort.cancelled() => {
            debug!(slug = %item.slug, "skipped after cancellation");
            return Ok(());
        }
    };
    if shared.abort.is_cancelled() {
        debug!(slug = %item.slug, "skipped after cancellation");
        return Ok(());
    }
    shared.queued.fetch_sub(1, Ordering::SeqCst);

    let result = isolated_process_item(&item, &shared).await;

    {
        let mut journal = shared.journal.lock().await;
        if let Err(e) = journal.append(result.clone()) {
            error!(slug = %item.slug, error = %e, "checkpoint write failed, result not persisted");
            shared.abort.cancel();
            return Err(ScoutError::Storage(format!(
                "checkpoint write failed for {}: {e}",
                item.slug
            )));
        }
    }
    let _ = finished.send(result);

    let delay = shared.config.min_delay;
    if !delay.is_zero() && shared.queued.load(Ordering::SeqCst) > 0 {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shared.abort.cancelled() => {}
        }
    }
    Ok(())
}

/// Run [`process_item`] in its own task so a panic while extracting one page
/// degrades that item instead of tearing down the run.
async fn isolated_process_item(item: &WorkItem, shared: &RunShared) -> ExtractionResult {
    let task = {
        let item = item.clone();
        let renderer = shared.renderer.clone();
        let extractor = shared.extractor.clone();
        let config = shared.config.clone();
        tokio::spawn(async move {
            process_item(&item, renderer.as_ref(), &extractor, &config).await
        })
    };

    match task.await {
        Ok(result) => result,
        Err(e) => {
            error!(slug = %item.slug, url = %item.url, error = %e, "item processing panicked");
            ExtractionResult::degraded(item, format!("extraction failed: {e}"))
        }
    }
}

/// Render and extract one item. Never fails: any navigation or content
/// error becomes a degraded result.
pub async fn process_item(
    item: &WorkItem,
    renderer: &dyn PageRenderer,
    extractor: &FieldExtractor,
    config: &CrawlConfig,
) -> ExtractionResult {
    match fetch_html(item, renderer, config).await {
        Ok(html) => extract_item(item, &html, extractor),
        Err(e) => {
            warn!(slug = %item.slug, url = %item.url, error = %e, "item degraded");
            ExtractionResult::degraded(item, e.to_string())
        }
    }
}

async fn fetch_html(
    item: &WorkItem,
    renderer: &dyn PageRenderer,
    config: &CrawlConfig,
) -> Result<String> {
    debug!(slug = %item.slug, url = %item.url, "navigating");

    let mut page = tokio::time::timeout(config.navigation_timeout, renderer.open(&item.url))
        .await
        .map_err(|_| {
            ScoutError::navigation(
                &item.url,
                format!("timed out after {}ms", config.navigation_timeout.as_millis()),
            )
        })??;

    match page.expand_collapsed(config.settle_delay).await {
        Ok(0) => {}
        Ok(expanded) => debug!(slug = %item.slug, expanded, "expanded collapsed sections"),
        Err(e) => warn!(slug = %item.slug, error = %e, "could not expand collapsed sections"),
    }

    page.content().await
}

/// Run every field cascade and the prize normalizer over one page's HTML.
pub fn extract_item(item: &WorkItem, html: &str, extractor: &FieldExtractor) -> ExtractionResult {
    let page = HtmlSnapshot::parse(html);
    let ctx = ItemContext {
        slug: &item.slug,
        known: &item.known,
    };

    let description = extractor.description(&page, &ctx);
    let total = extractor.total_reward(&page, &ctx);
    let prizes = extractor.prizes(&page, &ctx);
    let token = extractor.token(&page, &ctx);
    let region = extractor.region(&page, &ctx);

    let total_reward = total.as_ref().map(|t| t.value);
    let token_type = token
        .as_ref()
        .map(|t| t.value.as_str())
        .unwrap_or(DEFAULT_TOKEN);
    let raw = prizes.as_ref().map(|p| p.value.as_slice()).unwrap_or_default();
    let (prize_breakdown, verdict) = normalizer::breakdown(raw, token_type, total_reward);

    debug!(
        slug = %item.slug,
        prizes = prize_breakdown.total_prizes,
        total = ?total_reward,
        amounts_match = verdict.matches_total,
        "extracted item"
    );

    ExtractionResult {
        slug: item.slug.clone(),
        url: item.url.clone(),
        title: extract_title(&page, &ctx),
        provenance: Provenance {
            description: description.as_ref().map(|e| e.strategy.to_string()),
            total_reward: total.as_ref().map(|e| e.strategy.to_string()),
            prize_breakdown: prizes.as_ref().map(|e| e.strategy.to_string()),
            token: token.as_ref().map(|e| e.strategy.to_string()),
            region: region.as_ref().map(|e| e.strategy.to_string()),
        },
        description: description.map(|e| e.value),
        total_reward,
        prize_breakdown,
        individual_sum: verdict.individual_sum,
        amounts_match: verdict.matches_total,
        region: region.map(|e| e.value),
        outcome: Outcome::Success,
        error: None,
        known: item.known.clone(),
        extracted_at: Utc::now(),
    }
}
