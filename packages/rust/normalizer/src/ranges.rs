//! Range expansion and the ordinal-suffix rule.

use std::sync::LazyLock;

use bountyscout_shared::PrizeEntry;
use regex::Regex;
use tracing::debug;

/// Ranges wider than this are left unexpanded.
pub const MAX_RANGE_POSITIONS: u32 = 1000;

/// Render a position with its English ordinal suffix.
///
/// `1 → 1st`, `2 → 2nd`, `3 → 3rd`, `11 → 11th`, `21 → 21st`, `112 → 112th`.
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// Whether a label looks like a range at all (separator present).
fn has_range_separator(label: &str) -> bool {
    label.contains('-') || label.contains('–') || label.contains(" to ")
}

/// Parse `"5th - 10th"` / `"5–10"` into `(5, 10)`.
///
/// Returns `None` for labels that carry a separator but no usable bounds.
pub(crate) fn parse_range(label: &str) -> Option<(u32, u32)> {
    static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)(\d+)(?:st|nd|rd|th)?\s*[-–]\s*(\d+)(?:st|nd|rd|th)?")
            .expect("valid regex")
    });

    let caps = RANGE_RE.captures(label)?;
    let start: u32 = caps[1].parse().ok()?;
    let end: u32 = caps[2].parse().ok()?;

    if start == 0 || start > end || end - start >= MAX_RANGE_POSITIONS {
        return None;
    }
    Some((start, end))
}

/// Replace every range entry with one entry per position, same amount.
///
/// Entries without a separator are kept as-is; malformed ranges are passed
/// through unexpanded.
pub fn expand_ranges(entries: &[PrizeEntry]) -> Vec<PrizeEntry> {
    let mut expanded = Vec::with_capacity(entries.len());

    for entry in entries {
        if !has_range_separator(&entry.position_label) {
            expanded.push(entry.clone());
            continue;
        }

        match parse_range(&entry.position_label) {
            Some((start, end)) => {
                debug!(
                    label = %entry.position_label,
                    start,
                    end,
                    amount = entry.amount,
                    "expanded prize range"
                );
                expanded.extend((start..=end).map(|pos| PrizeEntry::new(ordinal(pos), entry.amount)));
            }
            None => {
                debug!(label = %entry.position_label, "malformed prize range, kept unexpanded");
                expanded.push(entry.clone());
            }
        }
    }

    expanded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_suffix_rule() {
        let rendered: Vec<String> = [1, 2, 3, 4, 11, 21].into_iter().map(ordinal).collect();
        assert_eq!(rendered, vec!["1st", "2nd", "3rd", "4th", "11th", "21st"]);

        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(13), "13th");
        assert_eq!(ordinal(22), "22nd");
        assert_eq!(ordinal(103), "103rd");
        assert_eq!(ordinal(111), "111th");
    }

    #[test]
    fn expands_spaced_range() {
        let out = expand_ranges(&[PrizeEntry::new("5th - 10th", 1000)]);
        let labels: Vec<&str> = out.iter().map(|e| e.position_label.as_str()).collect();
        assert_eq!(labels, vec!["5th", "6th", "7th", "8th", "9th", "10th"]);
        assert!(out.iter().all(|e| e.amount == 1000));
    }

    #[test]
    fn expands_en_dash_without_suffixes() {
        let out = expand_ranges(&[PrizeEntry::new("1–3", 50)]);
        let labels: Vec<&str> = out.iter().map(|e| e.position_label.as_str()).collect();
        assert_eq!(labels, vec!["1st", "2nd", "3rd"]);
    }

    #[test]
    fn malformed_range_passes_through() {
        let entries = [
            PrizeEntry::new("Top - Honorable", 100),
            PrizeEntry::new("10th - 5th", 20),
            PrizeEntry::new("1st - 99999999999", 1),
            PrizeEntry::new("5th to 10th", 50),
        ];
        let out = expand_ranges(&entries);
        assert_eq!(out, entries.to_vec());
    }

    #[test]
    fn plain_labels_untouched() {
        let entries = [PrizeEntry::new("1st", 500), PrizeEntry::new("additional", 250)];
        assert_eq!(expand_ranges(&entries), entries.to_vec());
    }

    #[test]
    fn oversized_range_is_not_expanded() {
        assert_eq!(parse_range("1st - 1000th"), Some((1, 1000)));
        assert_eq!(parse_range("1st - 1001th"), None);
    }
}
