//! Novelty filtering and worklist construction.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use bountyscout_shared::{CatalogRecord, KnownMetadata, Result, ScoutError, Slug, WorkItem};
use tracing::{debug, warn};
use url::Url;

/// Records whose slug is not in `processed`, first occurrence per slug, in
/// catalog order.
pub fn novel_records(records: Vec<CatalogRecord>, processed: &BTreeSet<Slug>) -> Vec<CatalogRecord> {
    let total = records.len();
    let mut seen = HashSet::new();
    let novel: Vec<CatalogRecord> = records
        .into_iter()
        .filter(|r| !processed.contains(&r.slug) && seen.insert(r.slug.clone()))
        .collect();

    debug!(total, novel = novel.len(), "filtered catalog records");
    novel
}

/// One work item per record. The page URL is the record's own URL when it
/// has one, otherwise `listing_base_url` joined with the slug.
///
/// Records with an empty slug are skipped.
pub fn build_worklist(records: &[CatalogRecord], listing_base_url: &str) -> Result<Vec<WorkItem>> {
    let base = listing_base(listing_base_url)?;
    let mut items = Vec::with_capacity(records.len());

    for record in records {
        if record.slug.as_str().trim().is_empty() {
            warn!(id = ?record.id, "catalog record without slug, skipping");
            continue;
        }

        let url = match record.url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(url) => url.to_string(),
            None => base
                .join(record.slug.as_str())
                .map_err(|e| {
                    ScoutError::validation(format!("cannot build URL for '{}': {e}", record.slug))
                })?
                .to_string(),
        };

        items.push(WorkItem {
            slug: record.slug.clone(),
            url,
            known: KnownMetadata::from(record),
        });
    }

    Ok(items)
}

/// Read a worklist file: a JSON array of catalog records or of bare
/// `{"slug": ..., "url": ...}` entries (`url` optional).
pub fn read_worklist(path: &Path, listing_base_url: &str) -> Result<Vec<WorkItem>> {
    let content = std::fs::read_to_string(path).map_err(|e| ScoutError::io(path, e))?;
    let records: Vec<CatalogRecord> = serde_json::from_str(&content).map_err(|e| {
        ScoutError::parse(format!("invalid worklist {}: {e}", path.display()))
    })?;
    build_worklist(&records, listing_base_url)
}

/// Parse the base URL, making sure joins append to its last segment.
fn listing_base(raw: &str) -> Result<Url> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&with_slash)
        .map_err(|e| ScoutError::validation(format!("invalid listing base URL '{raw}': {e}")))
}
