//! Total-reward strategies.

use std::sync::LazyLock;

use regex::Regex;

use super::{AMOUNT_PATTERN, FieldStrategy, ItemContext, first_amount, parse_amount, select_containing};
use crate::page::PageQuery;

/// The amount next to the "Total Prizes" label.
pub struct LabeledTotal;

impl FieldStrategy<u64> for LabeledTotal {
    fn name(&self) -> &'static str {
        "labeled_total"
    }

    fn attempt(&self, page: &dyn PageQuery, _ctx: &ItemContext<'_>) -> Option<u64> {
        for label in select_containing(page, "p", "Total Prizes") {
            let Some(container) = page
                .closest(label, "div")
                .or_else(|| page.closest(label, "td"))
            else {
                continue;
            };
            let amount = page
                .select_within(container, "span, p")
                .into_iter()
                .find_map(|id| first_amount(&page.text(id)));
            if amount.is_some() {
                return amount;
            }
        }
        None
    }
}

/// Currency-tagged amounts anywhere in the page text.
///
/// Patterns are tried in order; the first one that matches at all returns
/// the largest amount it matched.
pub struct TextScan;

static TOTAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        format!(r"(?i)({AMOUNT_PATTERN})\s*(?:USDC|SOL|JUP)\s*Total Prizes"),
        format!(r"(?i)Total Prizes[\s\S]*?({AMOUNT_PATTERN})\s*(?:USDC|SOL|JUP)"),
        format!(r"(?i)({AMOUNT_PATTERN})\s*(?:USDC|SOL|JUP)"),
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

impl FieldStrategy<u64> for TextScan {
    fn name(&self) -> &'static str {
        "text_scan"
    }

    fn attempt(&self, page: &dyn PageQuery, _ctx: &ItemContext<'_>) -> Option<u64> {
        let text = page.body_text();
        TOTAL_PATTERNS.iter().find_map(|re| {
            re.captures_iter(&text)
                .filter_map(|caps| parse_amount(&caps[1]))
                .max()
        })
    }
}

/// The catalog's declared reward, when it is a whole amount.
pub struct CatalogTotal;

impl FieldStrategy<u64> for CatalogTotal {
    fn name(&self) -> &'static str {
        "catalog_metadata"
    }

    fn attempt(&self, _page: &dyn PageQuery, ctx: &ItemContext<'_>) -> Option<u64> {
        ctx.known.whole_reward()
    }
}
