//! Run summaries and checkpoint status.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bountyscout_shared::{ExtractionResult, Result, Slug};

/// Label used in the region breakdown for results without a region.
pub const UNSPECIFIED_REGION: &str = "unspecified";

/// A degraded item and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedItem {
    pub slug: Slug,
    pub error: String,
}

/// Counts over a set of extraction results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub total: usize,
    pub succeeded: usize,
    pub degraded: usize,
    pub descriptions_found: usize,
    pub totals_found: usize,
    pub totals_matched: usize,
    pub regions: BTreeMap<String, usize>,
    pub degraded_items: Vec<DegradedItem>,
}

impl Tally {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ExtractionResult>) -> Self {
        let mut tally = Tally::default();
        for result in results {
            tally.add(result);
        }
        tally
    }

    fn add(&mut self, result: &ExtractionResult) {
        self.total += 1;
        if result.is_degraded() {
            self.degraded += 1;
            self.degraded_items.push(DegradedItem {
                slug: result.slug.clone(),
                error: result.error.clone().unwrap_or_default(),
            });
        } else {
            self.succeeded += 1;
        }
        if result.description.is_some() {
            self.descriptions_found += 1;
        }
        if result.total_reward.is_some() {
            self.totals_found += 1;
        }
        if result.amounts_match {
            self.totals_matched += 1;
        }
        let region = result.region.as_deref().unwrap_or(UNSPECIFIED_REGION);
        *self.regions.entry(region.to_string()).or_default() += 1;
    }
}

/// Outcome of one `run` or `crawl` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Records the catalog offered that were not processed before.
    pub new_records: usize,
    pub cancelled: bool,
    #[serde(flatten)]
    pub tally: Tally,
}

impl RunSummary {
    /// Write the summary as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        bountyscout_storage::write_json_atomic(path, self)
    }

    /// Summary for a run that found nothing to do.
    pub fn empty(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            new_records: 0,
            cancelled: false,
            tally: Tally::default(),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.finished_at - self.started_at;
        writeln!(f, "Run {}", self.run_id)?;
        writeln!(f, "  Elapsed:            {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0)?;
        if self.cancelled {
            writeln!(f, "  Cancelled:          yes (partial results kept)")?;
        }
        writeln!(f, "  New records:        {}", self.new_records)?;
        write_tally(f, &self.tally)
    }
}

/// Snapshot of persisted state, for `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub processed: usize,
    pub dataset_records: usize,
    #[serde(flatten)]
    pub checkpoint: Tally,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Processed slugs:    {}", self.processed)?;
        writeln!(f, "  Dataset records:    {}", self.dataset_records)?;
        write_tally(f, &self.checkpoint)
    }
}

fn write_tally(f: &mut fmt::Formatter<'_>, tally: &Tally) -> fmt::Result {
    writeln!(f, "  Crawled:            {}", tally.total)?;
    writeln!(f, "  Succeeded:          {}", tally.succeeded)?;
    writeln!(f, "  Degraded:           {}", tally.degraded)?;
    writeln!(f, "  Descriptions found: {}", tally.descriptions_found)?;
    writeln!(
        f,
        "  Totals matched:     {}/{}",
        tally.totals_matched, tally.totals_found
    )?;
    if !tally.regions.is_empty() {
        let regions: Vec<String> = tally
            .regions
            .iter()
            .map(|(region, count)| format!("{region}={count}"))
            .collect();
        writeln!(f, "  Regions:            {}", regions.join(", "))?;
    }
    for item in &tally.degraded_items {
        writeln!(f, "    ! {}: {}", item.slug, item.error)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bountyscout_shared::{KnownMetadata, WorkItem};

    fn item(slug: &str) -> WorkItem {
        WorkItem {
            slug: Slug::from(slug),
            url: format!("https://earn.example.com/listing/{slug}"),
            known: KnownMetadata::default(),
        }
    }

    #[test]
    fn tally_counts_outcomes_and_regions() {
        let mut ok = ExtractionResult::degraded(&item("ok"), "x");
        ok.outcome = bountyscout_shared::Outcome::Success;
        ok.error = None;
        ok.description = Some("text".into());
        ok.total_reward = Some(100);
        ok.amounts_match = true;
        ok.region = Some("IN".into());

        let bad = ExtractionResult::degraded(&item("bad"), "HTTP 404 Not Found");

        let tally = Tally::from_results([&ok, &bad]);
        assert_eq!(tally.total, 2);
        assert_eq!(tally.succeeded, 1);
        assert_eq!(tally.degraded, 1);
        assert_eq!(tally.descriptions_found, 1);
        assert_eq!(tally.totals_matched, 1);
        assert_eq!(tally.regions.get("IN"), Some(&1));
        assert_eq!(tally.regions.get(UNSPECIFIED_REGION), Some(&1));
        assert_eq!(tally.degraded_items[0].error, "HTTP 404 Not Found");
    }

    #[test]
    fn summary_serializes_flat() {
        let summary = RunSummary::empty(Uuid::now_v7(), Utc::now());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["total"], 0);
        assert_eq!(json["cancelled"], false);
        assert!(summary.to_string().contains("Crawled:            0"));
    }
}
