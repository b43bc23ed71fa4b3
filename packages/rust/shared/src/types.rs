//! Core domain types for BountyScout: catalog records, work items,
//! extraction results, prize sets, checkpoints, and merged dataset records.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel written to output records when every description strategy missed.
pub const DESCRIPTION_NOT_FOUND: &str = "Description not found";

/// Token assumed when neither the page nor the catalog names one.
pub const DEFAULT_TOKEN: &str = "USDC";

/// Position label for bonus amounts layered onto a regular position.
pub const ADDITIONAL_LABEL: &str = "additional";

// ---------------------------------------------------------------------------
// Slug
// ---------------------------------------------------------------------------

/// Stable, opaque key naming one catalog record.
///
/// Used for deduplication, checkpointing, and as the merge key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable fallback title: `my-cool-bounty` → `My Cool Bounty`.
    pub fn to_title(&self) -> String {
        self.0
            .split('-')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Slug {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Slug {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::borrow::Borrow<str> for Slug {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Sponsor object as returned by the catalog API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sponsor {
    #[serde(default)]
    pub name: Option<String>,
}

/// One row of the catalog listing API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub slug: Slug,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub reward_amount: Option<f64>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub sponsor: Option<Sponsor>,
    #[serde(default)]
    pub status: Option<String>,
    /// Direct listing URL, when the API supplies one.
    #[serde(default)]
    pub url: Option<String>,
}

/// Partial, possibly stale projection of catalog fields carried alongside
/// each work item. Used as a cheap fallback when page extraction misses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnownMetadata {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub reward_amount: Option<f64>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub sponsor: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl KnownMetadata {
    /// The declared reward as a whole amount, if it is one.
    pub fn whole_reward(&self) -> Option<u64> {
        self.reward_amount
            .filter(|r| r.is_finite() && *r > 0.0 && r.fract() == 0.0 && *r <= u64::MAX as f64)
            .map(|r| r as u64)
    }
}

impl From<&CatalogRecord> for KnownMetadata {
    fn from(record: &CatalogRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            reward_amount: record.reward_amount,
            token: record.token.clone(),
            deadline: record.deadline.clone(),
            sponsor: record.sponsor.as_ref().and_then(|s| s.name.clone()),
            status: record.status.clone(),
        }
    }
}

/// One unit of crawl work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub slug: Slug,
    pub url: String,
    #[serde(default)]
    pub known: KnownMetadata,
}

// ---------------------------------------------------------------------------
// Prizes
// ---------------------------------------------------------------------------

/// A single canonical prize: position label plus amount.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrizeEntry {
    /// Ordinal (`1st`, `2nd`, …) or [`ADDITIONAL_LABEL`].
    #[serde(rename = "position")]
    pub position_label: String,
    pub amount: u64,
}

impl PrizeEntry {
    pub fn new(position_label: impl Into<String>, amount: u64) -> Self {
        Self {
            position_label: position_label.into(),
            amount,
        }
    }
}

/// Ordered set of prize entries.
///
/// No two entries share the same `(position_label, amount)` pair; the first
/// occurrence wins and insertion order is preserved. The invariant is also
/// enforced when deserializing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<PrizeEntry>", into = "Vec<PrizeEntry>")]
pub struct PrizeSet {
    entries: Vec<PrizeEntry>,
    #[serde(skip)]
    seen: HashSet<(String, u64)>,
}

impl PrizeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry; returns `false` if an identical pair was already present.
    pub fn insert(&mut self, entry: PrizeEntry) -> bool {
        let key = (entry.position_label.clone(), entry.amount);
        if !self.seen.insert(key) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PrizeEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[PrizeEntry] {
        &self.entries
    }

    /// Sum of every amount in the set, or `None` if it overflows.
    pub fn checked_sum(&self) -> Option<u64> {
        self.entries
            .iter()
            .try_fold(0u64, |acc, e| acc.checked_add(e.amount))
    }

    /// Sum of every amount in the set, saturating at `u64::MAX`.
    pub fn individual_sum(&self) -> u64 {
        self.checked_sum().unwrap_or(u64::MAX)
    }

    /// `true` iff a total is known and equals the individual sum. A sum that
    /// overflows never matches.
    pub fn matches_total(&self, total: Option<u64>) -> bool {
        total.is_some_and(|t| self.checked_sum() == Some(t))
    }
}

impl FromIterator<PrizeEntry> for PrizeSet {
    fn from_iter<I: IntoIterator<Item = PrizeEntry>>(iter: I) -> Self {
        let mut set = PrizeSet::new();
        for entry in iter {
            set.insert(entry);
        }
        set
    }
}

impl From<Vec<PrizeEntry>> for PrizeSet {
    fn from(entries: Vec<PrizeEntry>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<PrizeSet> for Vec<PrizeEntry> {
    fn from(set: PrizeSet) -> Self {
        set.entries
    }
}

impl<'a> IntoIterator for &'a PrizeSet {
    type Item = &'a PrizeEntry;
    type IntoIter = std::slice::Iter<'a, PrizeEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Normalized prize table for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrizeBreakdown {
    #[serde(default)]
    pub individual_prizes: PrizeSet,
    #[serde(default = "default_token")]
    pub token_type: String,
    #[serde(default)]
    pub total_prizes: usize,
}

fn default_token() -> String {
    DEFAULT_TOKEN.into()
}

impl Default for PrizeBreakdown {
    fn default() -> Self {
        Self {
            individual_prizes: PrizeSet::new(),
            token_type: default_token(),
            total_prizes: 0,
        }
    }
}

impl PrizeBreakdown {
    pub fn new(prizes: PrizeSet, token_type: impl Into<String>) -> Self {
        Self {
            total_prizes: prizes.len(),
            individual_prizes: prizes,
            token_type: token_type.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ExtractionResult
// ---------------------------------------------------------------------------

/// Whether a work item produced extracted values or only an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Degraded,
}

/// Name of the strategy that produced each extracted field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_reward: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize_breakdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// The per-item record produced exactly once per work item per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub slug: Slug,
    pub url: String,
    pub title: String,
    /// `None` when every description strategy missed.
    pub description: Option<String>,
    /// `None` when the total is unknown.
    pub total_reward: Option<u64>,
    pub prize_breakdown: PrizeBreakdown,
    pub individual_sum: u64,
    pub amounts_match: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default)]
    pub provenance: Provenance,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub known: KnownMetadata,
    pub extracted_at: DateTime<Utc>,
}

impl ExtractionResult {
    /// A degraded result: the failure is recorded as data, nothing extracted.
    pub fn degraded(item: &WorkItem, error: impl Into<String>) -> Self {
        Self {
            slug: item.slug.clone(),
            url: item.url.clone(),
            title: item
                .known
                .title
                .clone()
                .unwrap_or_else(|| item.slug.to_title()),
            description: None,
            total_reward: None,
            prize_breakdown: PrizeBreakdown::default(),
            individual_sum: 0,
            amounts_match: false,
            region: None,
            provenance: Provenance::default(),
            outcome: Outcome::Degraded,
            error: Some(error.into()),
            known: item.known.clone(),
            extracted_at: Utc::now(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.outcome == Outcome::Degraded
    }
}

// ---------------------------------------------------------------------------
// CheckpointState
// ---------------------------------------------------------------------------

/// Persisted record of completed work; the sole source of truth for resuming.
///
/// Invariant: `completed_identifiers == { r.slug | r in results }`. The set is
/// rebuilt from `results` whenever a checkpoint is deserialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "CheckpointRepr")]
pub struct CheckpointState {
    completed_identifiers: BTreeSet<Slug>,
    results: Vec<ExtractionResult>,
}

#[derive(Deserialize)]
struct CheckpointRepr {
    #[serde(default)]
    #[allow(dead_code)]
    completed_identifiers: Vec<Slug>,
    #[serde(default)]
    results: Vec<ExtractionResult>,
}

impl From<CheckpointRepr> for CheckpointState {
    fn from(repr: CheckpointRepr) -> Self {
        let mut state = CheckpointState::new();
        for result in repr.results {
            state.append(result);
        }
        state
    }
}

impl CheckpointState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self, slug: &Slug) -> bool {
        self.completed_identifiers.contains(slug)
    }

    /// Append a result. Returns `false` (and keeps the first result) if the
    /// identifier was already completed.
    pub fn append(&mut self, result: ExtractionResult) -> bool {
        if !self.completed_identifiers.insert(result.slug.clone()) {
            return false;
        }
        self.results.push(result);
        true
    }

    /// Undo the most recent append (used when persisting it failed).
    pub fn pop(&mut self) -> Option<ExtractionResult> {
        let result = self.results.pop()?;
        self.completed_identifiers.remove(&result.slug);
        Some(result)
    }

    pub fn completed_identifiers(&self) -> &BTreeSet<Slug> {
        &self.completed_identifiers
    }

    pub fn results(&self) -> &[ExtractionResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<ExtractionResult> {
        self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

// ---------------------------------------------------------------------------
// MergedRecord
// ---------------------------------------------------------------------------

/// Prize data attached to each record of the output dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPrizeData {
    #[serde(default)]
    pub total_reward: Option<u64>,
    #[serde(default)]
    pub prize_breakdown: PrizeBreakdown,
    #[serde(default)]
    pub individual_sum: u64,
    #[serde(default)]
    pub amounts_match: bool,
    #[serde(default)]
    pub extraction_successful: bool,
}

impl Default for ExtractedPrizeData {
    /// The empty shape given to records without extracted prizes:
    /// no total, no prizes, token `USDC`, sum 0, nothing matched.
    fn default() -> Self {
        Self {
            total_reward: None,
            prize_breakdown: PrizeBreakdown::default(),
            individual_sum: 0,
            amounts_match: false,
            extraction_successful: false,
        }
    }
}

/// A description record extended with `extracted_prize_data`; one entry of
/// the cumulative output dataset, keyed by slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    pub slug: Slug,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub reward_amount: Option<f64>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub sponsor: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default)]
    pub extracted_prize_data: ExtractedPrizeData,
    /// Fields written by other tools; preserved untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(slug: &str) -> WorkItem {
        WorkItem {
            slug: Slug::from(slug),
            url: format!("https://earn.example.com/listing/{slug}"),
            known: KnownMetadata::default(),
        }
    }

    #[test]
    fn slug_title_case() {
        assert_eq!(Slug::from("write-a-thread-on-jup").to_title(), "Write A Thread On Jup");
        assert_eq!(Slug::from("--solo--").to_title(), "Solo");
    }

    #[test]
    fn prize_set_dedups_on_label_and_amount() {
        let mut set = PrizeSet::new();
        assert!(set.insert(PrizeEntry::new("1st", 500)));
        assert!(!set.insert(PrizeEntry::new("1st", 500)));
        assert!(set.insert(PrizeEntry::new("1st", 300)));
        assert!(set.insert(PrizeEntry::new("2nd", 500)));
        assert_eq!(set.len(), 3);
        assert_eq!(set.individual_sum(), 1300);
    }

    #[test]
    fn prize_set_deserialization_enforces_dedup() {
        let json = r#"[{"position":"1st","amount":100},{"position":"1st","amount":100},{"position":"2nd","amount":50}]"#;
        let set: PrizeSet = serde_json::from_str(json).expect("deserialize");
        assert_eq!(set.len(), 2);
        assert_eq!(set.as_slice()[1], PrizeEntry::new("2nd", 50));

        let back = serde_json::to_string(&set).expect("serialize");
        assert!(back.contains(r#""position":"1st""#));
    }

    #[test]
    fn matches_total_requires_known_total() {
        let set: PrizeSet = vec![PrizeEntry::new("1st", 1500), PrizeEntry::new("2nd", 500)].into();
        assert!(set.matches_total(Some(2000)));
        assert!(!set.matches_total(Some(1999)));
        assert!(!set.matches_total(None));
    }

    #[test]
    fn overflowing_sum_saturates_and_never_matches() {
        let set: PrizeSet = vec![PrizeEntry::new("1st", u64::MAX), PrizeEntry::new("2nd", 1)].into();
        assert_eq!(set.checked_sum(), None);
        assert_eq!(set.individual_sum(), u64::MAX);
        assert!(!set.matches_total(Some(u64::MAX)));
        assert!(!set.matches_total(Some(0)));
    }

    #[test]
    fn whole_reward_rejects_fractions() {
        let mut known = KnownMetadata {
            reward_amount: Some(2500.0),
            ..Default::default()
        };
        assert_eq!(known.whole_reward(), Some(2500));
        known.reward_amount = Some(12.5);
        assert_eq!(known.whole_reward(), None);
        known.reward_amount = Some(-3.0);
        assert_eq!(known.whole_reward(), None);
    }

    #[test]
    fn degraded_result_shape() {
        let result = ExtractionResult::degraded(&item("alpha-bounty"), "navigation timed out");
        assert!(result.is_degraded());
        assert_eq!(result.title, "Alpha Bounty");
        assert_eq!(result.total_reward, None);
        assert!(result.prize_breakdown.individual_prizes.is_empty());
        assert_eq!(result.prize_breakdown.token_type, DEFAULT_TOKEN);
        assert_eq!(result.error.as_deref(), Some("navigation timed out"));
    }

    #[test]
    fn checkpoint_rebuilds_completed_set_from_results() {
        let mut state = CheckpointState::new();
        state.append(ExtractionResult::degraded(&item("a"), "x"));
        state.append(ExtractionResult::degraded(&item("b"), "y"));
        assert!(!state.append(ExtractionResult::degraded(&item("a"), "dup")));

        let mut json: serde_json::Value = serde_json::to_value(&state).expect("serialize");
        // A stale or hand-edited completed list must not break the invariant.
        json["completed_identifiers"] = serde_json::json!(["a", "zzz"]);
        let parsed: CheckpointState = serde_json::from_value(json).expect("deserialize");

        let completed: Vec<&str> = parsed.completed_identifiers().iter().map(Slug::as_str).collect();
        assert_eq!(completed, vec!["a", "b"]);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed, state);
    }

    #[test]
    fn checkpoint_pop_restores_invariant() {
        let mut state = CheckpointState::new();
        state.append(ExtractionResult::degraded(&item("a"), "x"));
        let popped = state.pop().expect("one result");
        assert_eq!(popped.slug.as_str(), "a");
        assert!(state.completed_identifiers().is_empty());
        assert!(state.is_empty());
    }

    #[test]
    fn merged_record_defaults_and_extra_fields() {
        let json = r#"{"slug":"alpha","title":"Alpha","legacy_flag":true}"#;
        let record: MergedRecord = serde_json::from_str(json).expect("deserialize");
        assert_eq!(record.extracted_prize_data, ExtractedPrizeData::default());
        assert_eq!(record.extra.get("legacy_flag"), Some(&serde_json::json!(true)));

        let out = serde_json::to_value(&record).expect("serialize");
        assert_eq!(out["legacy_flag"], serde_json::json!(true));
        assert_eq!(out["extracted_prize_data"]["prize_breakdown"]["token_type"], "USDC");
    }

    #[test]
    fn catalog_record_reads_camel_case() {
        let json = r#"{"id":"42","slug":"alpha","title":"Alpha","rewardAmount":1500,"token":"USDC","sponsor":{"name":"Acme"}}"#;
        let record: CatalogRecord = serde_json::from_str(json).expect("deserialize");
        let known = KnownMetadata::from(&record);
        assert_eq!(known.reward_amount, Some(1500.0));
        assert_eq!(known.sponsor.as_deref(), Some("Acme"));
        assert_eq!(known.whole_reward(), Some(1500));
    }
}
