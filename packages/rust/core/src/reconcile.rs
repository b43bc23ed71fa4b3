//! Dataset reconciliation.
//!
//! The output dataset is keyed by slug. Description records are upserted
//! from crawl results, then prize data is merged on top from a set of
//! [`PrizeUpdate`]s. Both steps are idempotent.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use bountyscout_shared::{
    DESCRIPTION_NOT_FOUND, ExtractedPrizeData, ExtractionResult, MergedRecord, PrizeBreakdown,
    Slug,
};

/// Prize fields for one slug, as carried by a prize results document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrizeUpdate {
    pub slug: Slug,
    #[serde(default)]
    pub total_reward: Option<u64>,
    #[serde(default)]
    pub prize_breakdown: PrizeBreakdown,
    #[serde(default)]
    pub individual_sum: u64,
    #[serde(default)]
    pub amounts_match: bool,
}

impl From<&ExtractionResult> for PrizeUpdate {
    fn from(result: &ExtractionResult) -> Self {
        Self {
            slug: result.slug.clone(),
            total_reward: result.total_reward,
            prize_breakdown: result.prize_breakdown.clone(),
            individual_sum: result.individual_sum,
            amounts_match: result.amounts_match,
        }
    }
}

impl From<&PrizeUpdate> for ExtractedPrizeData {
    fn from(update: &PrizeUpdate) -> Self {
        Self {
            total_reward: update.total_reward,
            prize_breakdown: update.prize_breakdown.clone(),
            individual_sum: update.individual_sum,
            amounts_match: update.amounts_match,
            extraction_successful: update.total_reward.is_some(),
        }
    }
}

/// Per-run prize extraction output, also accepted by `merge`.
///
/// `successful_extractions` counts results whose prize sum matches the
/// declared total, while a record's `extraction_successful` only requires a
/// total to have been found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrizeResultsDocument {
    pub timestamp: DateTime<Utc>,
    pub total_bounties: usize,
    pub successful_extractions: usize,
    pub results: Vec<PrizeUpdate>,
}

impl PrizeResultsDocument {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ExtractionResult>) -> Self {
        let results: Vec<PrizeUpdate> = results.into_iter().map(PrizeUpdate::from).collect();
        Self {
            timestamp: Utc::now(),
            total_bounties: results.len(),
            successful_extractions: results.iter().filter(|r| r.amounts_match).count(),
            results,
        }
    }
}

/// Attach prize data to every record of `base`.
///
/// Records whose slug appears in `incoming` take that update's data; every
/// other record gets the empty shape. Length and order of `base` are kept.
/// When `incoming` repeats a slug, the last entry wins.
pub fn merge(base: &[MergedRecord], incoming: &[PrizeUpdate]) -> Vec<MergedRecord> {
    let by_slug: HashMap<&Slug, &PrizeUpdate> =
        incoming.iter().map(|update| (&update.slug, update)).collect();

    let mut matched = 0usize;
    let merged = base
        .iter()
        .map(|record| {
            let mut record = record.clone();
            record.extracted_prize_data = match by_slug.get(&record.slug) {
                Some(update) => {
                    matched += 1;
                    ExtractedPrizeData::from(*update)
                }
                None => ExtractedPrizeData::default(),
            };
            record
        })
        .collect();

    debug!(records = base.len(), matched, "merged prize data");
    merged
}

/// Counts from [`upsert_descriptions`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub inserted: usize,
    pub updated: usize,
}

/// The dataset record a crawl result produces, before prize data is merged.
pub fn description_record(result: &ExtractionResult) -> MergedRecord {
    let description = match (&result.error, &result.description) {
        (Some(error), _) => format!("Error: {error}"),
        (None, Some(text)) => text.clone(),
        (None, None) => DESCRIPTION_NOT_FOUND.to_string(),
    };

    MergedRecord {
        id: result.known.id.clone(),
        title: result.known.title.clone().unwrap_or_else(|| result.title.clone()),
        slug: result.slug.clone(),
        url: result.url.clone(),
        description,
        reward_amount: result.known.reward_amount,
        token: result.known.token.clone(),
        deadline: result.known.deadline.clone(),
        sponsor: result.known.sponsor.clone(),
        status: result.known.status.clone(),
        region: result.region.clone(),
        extracted_prize_data: ExtractedPrizeData::default(),
        extra: Default::default(),
    }
}

/// Upsert description records built from `results` into `dataset`.
///
/// A record with the same slug is replaced in place, keeping its prize data
/// and any fields this tool does not manage. New slugs are appended.
pub fn upsert_descriptions(dataset: &mut Vec<MergedRecord>, results: &[ExtractionResult]) -> UpsertStats {
    let mut index: HashMap<Slug, usize> = dataset
        .iter()
        .enumerate()
        .map(|(i, record)| (record.slug.clone(), i))
        .collect();
    let mut stats = UpsertStats::default();

    for result in results {
        let mut record = description_record(result);
        match index.get(&result.slug) {
            Some(&i) => {
                let existing = &mut dataset[i];
                record.extracted_prize_data = std::mem::take(&mut existing.extracted_prize_data);
                record.extra = std::mem::take(&mut existing.extra);
                *existing = record;
                stats.updated += 1;
            }
            None => {
                index.insert(result.slug.clone(), dataset.len());
                dataset.push(record);
                stats.inserted += 1;
            }
        }
    }

    debug!(inserted = stats.inserted, updated = stats.updated, "upserted descriptions");
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use bountyscout_shared::{KnownMetadata, Outcome, PrizeEntry, PrizeSet, Provenance};

    fn record(slug: &str) -> MergedRecord {
        serde_json::from_value(serde_json::json!({ "slug": slug, "title": slug })).unwrap()
    }

    fn update(slug: &str, total: Option<u64>, prizes: &[(&str, u64)]) -> PrizeUpdate {
        let set: PrizeSet = prizes.iter().map(|(l, a)| PrizeEntry::new(*l, *a)).collect();
        PrizeUpdate {
            slug: Slug::from(slug),
            total_reward: total,
            individual_sum: set.individual_sum(),
            amounts_match: set.matches_total(total),
            prize_breakdown: PrizeBreakdown::new(set, "USDC"),
        }
    }

    fn result(slug: &str, description: Option<&str>, error: Option<&str>) -> ExtractionResult {
        ExtractionResult {
            slug: Slug::from(slug),
            url: format!("https://earn.example.com/listing/{slug}"),
            title: slug.to_uppercase(),
            description: description.map(String::from),
            total_reward: Some(100),
            prize_breakdown: PrizeBreakdown::new(vec![PrizeEntry::new("1st", 100)].into(), "USDC"),
            individual_sum: 100,
            amounts_match: true,
            region: Some("GLOBAL".into()),
            provenance: Provenance::default(),
            outcome: if error.is_some() { Outcome::Degraded } else { Outcome::Success },
            error: error.map(String::from),
            known: KnownMetadata {
                id: Some(format!("id-{slug}")),
                ..Default::default()
            },
            extracted_at: Utc::now(),
        }
    }

    #[test]
    fn merge_is_total_and_keeps_order() {
        let base = vec![record("a"), record("b"), record("c")];
        let incoming = vec![update("b", Some(500), &[("1st", 500)]), update("zzz", Some(1), &[])];

        let merged = merge(&base, &incoming);
        assert_eq!(merged.len(), 3);
        let slugs: Vec<&str> = merged.iter().map(|r| r.slug.as_str()).collect();
        assert_eq!(slugs, vec!["a", "b", "c"]);

        assert_eq!(merged[0].extracted_prize_data, ExtractedPrizeData::default());
        assert_eq!(merged[1].extracted_prize_data.total_reward, Some(500));
        assert!(merged[1].extracted_prize_data.amounts_match);
        assert!(merged[1].extracted_prize_data.extraction_successful);
        assert_eq!(merged[2].extracted_prize_data, ExtractedPrizeData::default());
    }

    #[test]
    fn merge_is_idempotent() {
        let base = vec![record("a"), record("b")];
        let incoming = vec![update("a", None, &[("1st", 10)])];

        let once = merge(&base, &incoming);
        let twice = merge(&once, &incoming);
        assert_eq!(once, twice);
        assert!(!once[0].extracted_prize_data.extraction_successful);
        assert_eq!(once[0].extracted_prize_data.individual_sum, 10);
    }

    #[test]
    fn merge_last_duplicate_wins() {
        let base = vec![record("a")];
        let incoming = vec![update("a", Some(1), &[]), update("a", Some(2), &[])];
        assert_eq!(merge(&base, &incoming)[0].extracted_prize_data.total_reward, Some(2));
    }

    #[test]
    fn merge_resets_stale_prize_data() {
        let mut stale = record("a");
        stale.extracted_prize_data.total_reward = Some(999);
        let merged = merge(&[stale], &[]);
        assert_eq!(merged[0].extracted_prize_data, ExtractedPrizeData::default());
    }

    #[test]
    fn description_record_uses_sentinels() {
        assert_eq!(description_record(&result("a", None, None)).description, DESCRIPTION_NOT_FOUND);
        assert_eq!(
            description_record(&result("b", None, Some("timed out after 30000ms"))).description,
            "Error: timed out after 30000ms"
        );
        let found = description_record(&result("c", Some("Write a thread."), None));
        assert_eq!(found.description, "Write a thread.");
        assert_eq!(found.id.as_deref(), Some("id-c"));
        assert_eq!(found.title, "C");
        assert_eq!(found.region.as_deref(), Some("GLOBAL"));
    }

    #[test]
    fn upsert_replaces_in_place_and_appends() {
        let mut existing = record("b");
        existing.extracted_prize_data.total_reward = Some(42);
        existing.extra.insert("notes".into(), serde_json::json!("keep me"));
        let mut dataset = vec![record("a"), existing];

        let stats = upsert_descriptions(
            &mut dataset,
            &[result("b", Some("fresh text"), None), result("c", None, None)],
        );

        assert_eq!(stats, UpsertStats { inserted: 1, updated: 1 });
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset[1].slug.as_str(), "b");
        assert_eq!(dataset[1].description, "fresh text");
        assert_eq!(dataset[1].extracted_prize_data.total_reward, Some(42));
        assert_eq!(dataset[1].extra["notes"], "keep me");
        assert_eq!(dataset[2].slug.as_str(), "c");

        let again = upsert_descriptions(&mut dataset, &[result("c", None, None)]);
        assert_eq!(again, UpsertStats { inserted: 0, updated: 1 });
        assert_eq!(dataset.len(), 3);
    }

    #[test]
    fn results_document_counts_consistent_results() {
        let mismatched = {
            let mut r = result("c", None, None);
            r.total_reward = Some(900);
            r.amounts_match = false;
            r
        };
        let results = vec![
            result("a", None, None),
            {
                let mut r = result("b", None, Some("HTTP 404"));
                r.total_reward = None;
                r.amounts_match = false;
                r
            },
            mismatched,
        ];
        let doc = PrizeResultsDocument::from_results(&results);
        assert_eq!(doc.total_bounties, 3);
        assert_eq!(doc.successful_extractions, 1);
        // A found but inconsistent total still marks the record extracted.
        assert!(ExtractedPrizeData::from(&doc.results[2]).extraction_successful);

        let json = serde_json::to_string(&doc).unwrap();
        let back: PrizeResultsDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back.results[0].prize_breakdown.individual_prizes.len(), 1);
    }
}
