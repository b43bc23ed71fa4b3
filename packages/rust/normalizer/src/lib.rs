//! Prize normalization: raw `(position, amount)` pairs → canonical [`PrizeSet`].
//!
//! The pipeline is three passes applied in sequence:
//! 1. range expansion (`"5th - 10th"` → six entries),
//! 2. deduplication on `(position_label, amount)`, first occurrence wins,
//! 3. validation of the individual sum against a declared total.

mod ranges;

use bountyscout_shared::{PrizeBreakdown, PrizeEntry, PrizeSet};
use tracing::debug;

pub use ranges::{MAX_RANGE_POSITIONS, expand_ranges, ordinal};

/// Consistency verdict for a prize set against a declared total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validation {
    /// Sum of every final amount.
    pub individual_sum: u64,
    /// `true` iff a total was found and equals `individual_sum`.
    pub matches_total: bool,
}

/// Expand ranges and deduplicate raw entries into a canonical prize set.
pub fn normalize(raw: &[PrizeEntry]) -> PrizeSet {
    let expanded = expand_ranges(raw);
    let before = expanded.len();
    let set: PrizeSet = expanded.into_iter().collect();

    if set.len() < before {
        debug!(dropped = before - set.len(), "removed duplicate prize entries");
    }
    set
}

/// Cross-check a prize set against the declared total.
///
/// An absent total is not an error; it simply never matches.
pub fn validate(prizes: &PrizeSet, total: Option<u64>) -> Validation {
    Validation {
        individual_sum: prizes.individual_sum(),
        matches_total: prizes.matches_total(total),
    }
}

/// Normalize raw entries and package them with their token and verdict.
pub fn breakdown(
    raw: &[PrizeEntry],
    token_type: &str,
    total: Option<u64>,
) -> (PrizeBreakdown, Validation) {
    let prizes = normalize(raw);
    let verdict = validate(&prizes, total);
    (PrizeBreakdown::new(prizes, token_type), verdict)
}
