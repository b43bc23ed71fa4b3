//! Region-restriction strategies.

use super::{FieldStrategy, ItemContext};
use crate::page::PageQuery;

/// Region codes that appear as bare spans on listing pages.
pub const KNOWN_REGION_CODES: [&str; 10] =
    ["IE", "IN", "VN", "US", "UK", "CA", "AU", "DE", "FR", "GLOBAL"];

const GLOBAL: &str = "GLOBAL";

/// The muted badge next to the sponsor name: a two-letter country code.
pub struct SlateRegionCode;

impl FieldStrategy<String> for SlateRegionCode {
    fn name(&self) -> &'static str {
        "slate_badge"
    }

    fn attempt(&self, page: &dyn PageQuery, _ctx: &ItemContext<'_>) -> Option<String> {
        page.select("span.text-slate-400")
            .into_iter()
            .map(|id| page.text(id).trim().to_string())
            .find(|t| t.len() == 2 && t.chars().all(|c| c.is_ascii_uppercase()))
    }
}

/// Any span whose whole text is a known region code.
pub struct KnownRegionCode;

impl FieldStrategy<String> for KnownRegionCode {
    fn name(&self) -> &'static str {
        "known_code"
    }

    fn attempt(&self, page: &dyn PageQuery, _ctx: &ItemContext<'_>) -> Option<String> {
        page.select("span")
            .into_iter()
            .map(|id| page.text(id).trim().to_string())
            .find(|t| KNOWN_REGION_CODES.contains(&t.as_str()))
    }
}

/// Pages that mention "global" are open to everyone.
pub struct GlobalMention;

impl FieldStrategy<String> for GlobalMention {
    fn name(&self) -> &'static str {
        "global_mention"
    }

    fn attempt(&self, page: &dyn PageQuery, _ctx: &ItemContext<'_>) -> Option<String> {
        page.body_text()
            .to_lowercase()
            .contains("global")
            .then(|| GLOBAL.to_string())
    }
}
