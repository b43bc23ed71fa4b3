//! Prize-breakdown strategies.
//!
//! Listing pages render each prize as a row: an amount paragraph
//! (`p.ml-auto` inside `div.flex.gap-1`) beside a position paragraph
//! (`p.mt-auto.mb-1`). Bonus amounts show up as `+N` in the same row.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use bountyscout_shared::{ADDITIONAL_LABEL, PrizeEntry};

use super::{
    AMOUNT_PATTERN, FieldStrategy, ItemContext, is_position_label, mentions_ordinal, parse_amount,
};
use crate::page::{ElementId, PageQuery};

const ROW: &str = "div.relative.flex.gap-3";
const AMOUNT_CONTAINER: &str = "div.flex.gap-1";
const AMOUNT: &str = "p.ml-auto";
const POSITION: &str = "p.mt-auto.mb-1";

static BONUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\+({AMOUNT_PATTERN})")).expect("valid regex"));

/// The position label of a row: the first paragraph that is either styled
/// as a position or names an ordinal, and reads as a position.
fn row_position(page: &dyn PageQuery, row: ElementId) -> Option<String> {
    let styled: HashSet<ElementId> = page.select_within(row, POSITION).into_iter().collect();
    let candidate = page.select_within(row, "p").into_iter().find(|&id| {
        styled.contains(&id) || mentions_ordinal(&page.text(id))
    })?;

    let label = page.text(candidate).trim().to_string();
    is_position_label(&label).then_some(label)
}

/// The row's `+N` bonus, if any.
fn row_bonus(page: &dyn PageQuery, row: ElementId) -> Option<u64> {
    let text = page
        .select_within(row, "p")
        .into_iter()
        .map(|id| page.text(id))
        .find(|t| t.contains('+'))?;
    let caps = BONUS_RE.captures(&text)?;
    parse_amount(&caps[1])
}

/// Row-by-row pairing of amount and position.
pub struct RowPairs;

impl FieldStrategy<Vec<PrizeEntry>> for RowPairs {
    fn name(&self) -> &'static str {
        "row_pairs"
    }

    fn attempt(&self, page: &dyn PageQuery, _ctx: &ItemContext<'_>) -> Option<Vec<PrizeEntry>> {
        let mut entries = Vec::new();

        for row in page.select(ROW) {
            let amount = page
                .select_within(row, AMOUNT_CONTAINER)
                .first()
                .and_then(|&c| page.select_within(c, AMOUNT).first().copied())
                .and_then(|id| parse_amount(&page.text(id)));

            if let Some(amount) = amount {
                if let Some(label) = row_position(page, row) {
                    entries.push(PrizeEntry::new(label, amount));
                }
            }

            if let Some(bonus) = row_bonus(page, row) {
                entries.push(PrizeEntry::new(ADDITIONAL_LABEL, bonus));
            }
        }

        Some(entries)
    }
}

/// Start from every amount paragraph and walk up to its row.
///
/// Catches rows whose amount is not wrapped in the usual container.
pub struct AncestorWalk;

impl FieldStrategy<Vec<PrizeEntry>> for AncestorWalk {
    fn name(&self) -> &'static str {
        "ancestor_walk"
    }

    fn attempt(&self, page: &dyn PageQuery, _ctx: &ItemContext<'_>) -> Option<Vec<PrizeEntry>> {
        let entries = page
            .select(AMOUNT)
            .into_iter()
            .filter_map(|id| {
                let amount = parse_amount(&page.text(id))?;
                let row = page.closest(id, ROW)?;
                let label = row_position(page, row)?;
                Some(PrizeEntry::new(label, amount))
            })
            .collect();
        Some(entries)
    }
}

/// Amount/ordinal pairs found in free text, in either order.
pub struct TextPattern;

const ORDINALS: &str = "1st|2nd|3rd|4th|5th|6th|7th|8th|9th|10th";

static AMOUNT_THEN_POSITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)({AMOUNT_PATTERN})\s*(?:USDC|SOL|JUP).*?\b({ORDINALS})\b"
    ))
    .expect("valid regex")
});

static POSITION_THEN_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)\b({ORDINALS})\b.*?({AMOUNT_PATTERN})\s*(?:USDC|SOL|JUP)"
    ))
    .expect("valid regex")
});

impl FieldStrategy<Vec<PrizeEntry>> for TextPattern {
    fn name(&self) -> &'static str {
        "text_pattern"
    }

    fn attempt(&self, page: &dyn PageQuery, _ctx: &ItemContext<'_>) -> Option<Vec<PrizeEntry>> {
        let text = page.body_text();
        let mut entries = Vec::new();

        for caps in AMOUNT_THEN_POSITION.captures_iter(&text) {
            if let Some(amount) = parse_amount(&caps[1]) {
                entries.push(PrizeEntry::new(caps[2].to_lowercase(), amount));
            }
        }
        for caps in POSITION_THEN_AMOUNT.captures_iter(&text) {
            if let Some(amount) = parse_amount(&caps[2]) {
                entries.push(PrizeEntry::new(caps[1].to_lowercase(), amount));
            }
        }

        Some(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::HtmlSnapshot;
    use bountyscout_shared::{KnownMetadata, Slug};

    fn run(strategy: &dyn FieldStrategy<Vec<PrizeEntry>>, html: &str) -> Vec<PrizeEntry> {
        let page = HtmlSnapshot::parse(html);
        let slug = Slug::from("x");
        let known = KnownMetadata::default();
        strategy
            .attempt(&page, &ItemContext { slug: &slug, known: &known })
            .unwrap_or_default()
    }

    fn row(amount: &str, position: &str) -> String {
        format!(
            r#"<div class="relative flex gap-3">
                 <div class="flex gap-1"><p class="ml-auto">{amount}</p><p>USDC</p></div>
                 <p class="mt-auto mb-1 text-xs">{position}</p>
               </div>"#
        )
    }

    #[test]
    fn row_pairs_reads_each_row() {
        let html = format!("{}{}{}", row("1,000", "1st"), row("500", "2nd"), row("250", "5th - 10th"));
        let entries = run(&RowPairs, &html);
        assert_eq!(
            entries,
            vec![
                PrizeEntry::new("1st", 1000),
                PrizeEntry::new("2nd", 500),
                PrizeEntry::new("5th - 10th", 250),
            ]
        );
    }

    #[test]
    fn row_pairs_captures_bonus_and_rejects_non_positions() {
        let html = format!(
            r#"{}<div class="relative flex gap-3">
                 <div class="flex gap-1"><p class="ml-auto">300</p></div>
                 <p class="mt-auto mb-1">Winner</p>
                 <p>+1,500</p>
               </div>"#,
            row("700", "1st")
        );
        let entries = run(&RowPairs, &html);
        assert_eq!(
            entries,
            vec![PrizeEntry::new("1st", 700), PrizeEntry::new(ADDITIONAL_LABEL, 1500)]
        );
    }

    #[test]
    fn row_pairs_rejects_non_numeric_amounts() {
        let entries = run(&RowPairs, &row("1,000 USDC", "1st"));
        assert!(entries.is_empty());
    }

    #[test]
    fn ancestor_walk_finds_unwrapped_amounts() {
        let html = r#"<div class="relative flex gap-3">
                        <p class="ml-auto">900</p>
                        <p>3rd</p>
                      </div>"#;
        assert!(run(&RowPairs, html).is_empty());
        assert_eq!(run(&AncestorWalk, html), vec![PrizeEntry::new("3rd", 900)]);
    }

    #[test]
    fn text_pattern_pairs_amounts_with_ordinals() {
        let amount_first = "<body><p>2,000 USDC</p><p>awarded to the 1st place</p></body>";
        assert_eq!(run(&TextPattern, amount_first), vec![PrizeEntry::new("1st", 2000)]);

        let position_first = "<body><p>2ND place</p><p>800 SOL</p></body>";
        assert_eq!(run(&TextPattern, position_first), vec![PrizeEntry::new("2nd", 800)]);

        assert!(run(&TextPattern, "<p>1,000 USDC pool</p>").is_empty());
    }
}
