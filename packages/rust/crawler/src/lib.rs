//! Page rendering, cascading field extraction, and the crawl orchestrator.
//!
//! This crate provides:
//! - [`page`] : the rendered-page capability ([`PageRenderer`], [`PageQuery`])
//! - [`strategies`] : per-field strategy cascades ([`FieldExtractor`])
//! - [`engine`] : the bounded-concurrency, checkpointed [`Orchestrator`]

pub mod engine;
pub mod page;
pub mod strategies;

pub use engine::{
    CrawlObserver, NoopObserver, Orchestrator, extract_item, pending_items, process_item,
};
pub use page::{
    ElementId, HtmlSnapshot, HttpRenderer, PageQuery, PageRenderer, RenderedPage, StaticPage,
};
pub use strategies::{
    Cascade, Extracted, Field, FieldExtractor, FieldStrategy, FieldValue, ItemContext,
    extract_title,
};
