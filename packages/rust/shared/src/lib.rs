//! Shared types, error model, and configuration for BountyScout.
//!
//! This crate is the foundation depended on by all other BountyScout crates.
//! It provides:
//! - [`ScoutError`] : the unified error type
//! - Domain types ([`WorkItem`], [`ExtractionResult`], [`PrizeSet`], [`CheckpointState`], [`MergedRecord`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CatalogConfig, CrawlConfig, CrawlPoliciesConfig, PathsConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_config,
};
pub use error::{Result, ScoutError};
pub use types::{
    ADDITIONAL_LABEL, CatalogRecord, CheckpointState, DEFAULT_TOKEN, DESCRIPTION_NOT_FOUND,
    ExtractedPrizeData, ExtractionResult, KnownMetadata, MergedRecord, Outcome, PrizeBreakdown,
    PrizeEntry, PrizeSet, Provenance, Slug, Sponsor, WorkItem,
};
