//! Cascading field extraction.
//!
//! Each field owns a [`Cascade`]: strategies tried in priority order, the
//! first value that passes the field's validity check wins, and no later
//! strategy runs. Later strategies are progressively looser fallbacks for
//! layouts where the primary markup is absent.

mod description;
mod prizes;
mod region;
mod token;
mod total;

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use bountyscout_shared::{KnownMetadata, PrizeEntry, Slug};

use crate::page::{ElementId, PageQuery};

pub use description::{BlockScan, MainLines, ParagraphScan, Probe, SelectorList};
pub use prizes::{AncestorWalk, RowPairs, TextPattern};
pub use region::{GlobalMention, KnownRegionCode, SlateRegionCode};
pub use token::{CatalogToken, DefaultToken, SpanVocabulary};
pub use total::{CatalogTotal, LabeledTotal, TextScan};

/// Reward tokens recognised on listing pages, in lookup priority.
pub const TOKEN_VOCABULARY: [&str; 3] = ["USDC", "SOL", "JUP"];

// ---------------------------------------------------------------------------
// Trait + cascade
// ---------------------------------------------------------------------------

/// What a strategy may know about the item besides the page.
#[derive(Debug, Clone, Copy)]
pub struct ItemContext<'a> {
    pub slug: &'a Slug,
    pub known: &'a KnownMetadata,
}

/// One way of pulling a field out of a page.
pub trait FieldStrategy<T>: Send + Sync {
    /// Stable name recorded as provenance.
    fn name(&self) -> &'static str;

    /// Try to extract the field; `None` when this strategy found nothing.
    fn attempt(&self, page: &dyn PageQuery, ctx: &ItemContext<'_>) -> Option<T>;
}

/// A value plus the strategy that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted<T> {
    pub value: T,
    pub strategy: &'static str,
}

impl<T> Extracted<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Extracted<U> {
        Extracted {
            value: f(self.value),
            strategy: self.strategy,
        }
    }
}

/// Ordered strategies for one field, with a validity predicate.
pub struct Cascade<T> {
    field: &'static str,
    strategies: Vec<Box<dyn FieldStrategy<T>>>,
    is_valid: fn(&T) -> bool,
}

impl<T> Cascade<T> {
    pub fn new(field: &'static str, is_valid: fn(&T) -> bool) -> Self {
        Self {
            field,
            strategies: Vec::new(),
            is_valid,
        }
    }

    /// Append a strategy at the lowest priority so far.
    pub fn then(mut self, strategy: impl FieldStrategy<T> + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run strategies in order and stop at the first valid value.
    pub fn run(&self, page: &dyn PageQuery, ctx: &ItemContext<'_>) -> Option<Extracted<T>> {
        for strategy in &self.strategies {
            if let Some(value) = strategy.attempt(page, ctx) {
                if (self.is_valid)(&value) {
                    debug!(slug = %ctx.slug, field = self.field, strategy = strategy.name(), "field extracted");
                    return Some(Extracted {
                        value,
                        strategy: strategy.name(),
                    });
                }
                debug!(slug = %ctx.slug, field = self.field, strategy = strategy.name(), "value rejected");
            }
        }
        debug!(slug = %ctx.slug, field = self.field, "all strategies missed");
        None
    }
}

// ---------------------------------------------------------------------------
// FieldExtractor
// ---------------------------------------------------------------------------

/// Fields the extractor knows how to pull out of a listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Description,
    TotalReward,
    PrizeBreakdown,
    Token,
    Region,
}

/// Untyped field value, as returned by [`FieldExtractor::extract`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Amount(u64),
    Prizes(Vec<PrizeEntry>),
}

/// All field cascades for a listing page.
pub struct FieldExtractor {
    description: Cascade<String>,
    total_reward: Cascade<u64>,
    prizes: Cascade<Vec<PrizeEntry>>,
    token: Cascade<String>,
    region: Cascade<String>,
}

impl FieldExtractor {
    /// The built-in strategies for every field.
    pub fn new() -> Self {
        Self {
            description: Cascade::new("description", |s: &String| !s.trim().is_empty())
                .then(SelectorList::default())
                .then(ParagraphScan)
                .then(MainLines)
                .then(BlockScan),
            total_reward: Cascade::new("total_reward", |t: &u64| *t > 0)
                .then(LabeledTotal)
                .then(TextScan)
                .then(CatalogTotal),
            prizes: Cascade::new("prize_breakdown", |p: &Vec<PrizeEntry>| !p.is_empty())
                .then(RowPairs)
                .then(AncestorWalk)
                .then(TextPattern),
            token: Cascade::new("token", |t: &String| !t.is_empty())
                .then(SpanVocabulary)
                .then(CatalogToken)
                .then(DefaultToken),
            region: Cascade::new("region", |r: &String| !r.is_empty())
                .then(SlateRegionCode)
                .then(KnownRegionCode)
                .then(GlobalMention),
        }
    }

    pub fn with_description(mut self, cascade: Cascade<String>) -> Self {
        self.description = cascade;
        self
    }

    pub fn with_total_reward(mut self, cascade: Cascade<u64>) -> Self {
        self.total_reward = cascade;
        self
    }

    pub fn with_prizes(mut self, cascade: Cascade<Vec<PrizeEntry>>) -> Self {
        self.prizes = cascade;
        self
    }

    /// Extract one field by name.
    pub fn extract(
        &self,
        page: &dyn PageQuery,
        ctx: &ItemContext<'_>,
        field: Field,
    ) -> Option<Extracted<FieldValue>> {
        match field {
            Field::Description => self.description(page, ctx).map(|e| e.map(FieldValue::Text)),
            Field::TotalReward => self.total_reward(page, ctx).map(|e| e.map(FieldValue::Amount)),
            Field::PrizeBreakdown => self.prizes(page, ctx).map(|e| e.map(FieldValue::Prizes)),
            Field::Token => self.token(page, ctx).map(|e| e.map(FieldValue::Text)),
            Field::Region => self.region(page, ctx).map(|e| e.map(FieldValue::Text)),
        }
    }

    pub fn description(&self, page: &dyn PageQuery, ctx: &ItemContext<'_>) -> Option<Extracted<String>> {
        self.description.run(page, ctx)
    }

    pub fn total_reward(&self, page: &dyn PageQuery, ctx: &ItemContext<'_>) -> Option<Extracted<u64>> {
        self.total_reward.run(page, ctx)
    }

    /// Raw prize pairs; ranges are still compact and duplicates not removed.
    pub fn prizes(
        &self,
        page: &dyn PageQuery,
        ctx: &ItemContext<'_>,
    ) -> Option<Extracted<Vec<PrizeEntry>>> {
        self.prizes.run(page, ctx)
    }

    pub fn token(&self, page: &dyn PageQuery, ctx: &ItemContext<'_>) -> Option<Extracted<String>> {
        self.token.run(page, ctx)
    }

    pub fn region(&self, page: &dyn PageQuery, ctx: &ItemContext<'_>) -> Option<Extracted<String>> {
        self.region.run(page, ctx)
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Page title, else the catalog title, else the slug in title case.
pub fn extract_title(page: &dyn PageQuery, ctx: &ItemContext<'_>) -> String {
    page.title()
        .or_else(|| ctx.known.title.clone().filter(|t| !t.trim().is_empty()))
        .unwrap_or_else(|| ctx.slug.to_title())
}

// ---------------------------------------------------------------------------
// Shared text helpers
// ---------------------------------------------------------------------------

/// A whole amount with optional thousands separators.
pub(crate) const AMOUNT_PATTERN: &str = r"\d+(?:,\d{3})*";

static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(AMOUNT_PATTERN).expect("valid regex"));

static POSITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\d+(?:st|nd|rd|th)(?:\s*(?:[-–]|to)\s*\d+(?:st|nd|rd|th)?)?$")
        .expect("valid regex")
});

static ORDINAL_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:1st|2nd|3rd|[4-9]th|10th)\b").expect("valid regex")
});

/// Largest amount accepted from page text; anything above is markup noise.
pub const MAX_AMOUNT: u64 = 1_000_000_000_000;

/// Parse text that is entirely an amount (`"1,000"` → 1000).
///
/// Rejects anything with non-digit characters once separators are removed,
/// and amounts above [`MAX_AMOUNT`].
pub(crate) fn parse_amount(text: &str) -> Option<u64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    cleaned.parse::<u64>().ok().filter(|amount| *amount <= MAX_AMOUNT)
}

/// The first amount token anywhere in `text`.
pub(crate) fn first_amount(text: &str) -> Option<u64> {
    AMOUNT_RE
        .find_iter(text)
        .find_map(|m| parse_amount(m.as_str()))
}

/// Whether a label is an ordinal position or a range of them.
pub(crate) fn is_position_label(label: &str) -> bool {
    POSITION_RE.is_match(label.trim())
}

/// Whether text names one of the first ten positions.
pub(crate) fn mentions_ordinal(text: &str) -> bool {
    ORDINAL_WORD_RE.is_match(text)
}

/// Elements matching `css` whose text contains `needle`, ignoring case.
pub(crate) fn select_containing(page: &dyn PageQuery, css: &str, needle: &str) -> Vec<ElementId> {
    let needle = needle.to_lowercase();
    page.select(css)
        .into_iter()
        .filter(|&id| page.text(id).to_lowercase().contains(&needle))
        .collect()
}
