//! Core pipeline orchestration and domain logic for BountyScout.
//!
//! This crate ties together catalog discovery, the crawl orchestrator, and
//! dataset reconciliation into end-to-end workflows (e.g., [`run_pipeline`]).

pub mod pipeline;
pub mod reconcile;
pub mod summary;

pub use pipeline::{
    MergeReport, PipelineConfig, ProgressReporter, SilentProgress, crawl_worklist,
    merge_results_file, reconcile_dataset, run_pipeline, status,
};
pub use reconcile::{PrizeResultsDocument, PrizeUpdate, UpsertStats, merge, upsert_descriptions};
pub use summary::{DegradedItem, RunSummary, StatusReport, Tally};
