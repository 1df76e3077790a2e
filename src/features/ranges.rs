use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::number::parse_number;

const NUMERAL: &str = r"-?\s*[\d.,eE^*·⋅]+(?:\s*[*·⋅]\s*[\d.,eE^]+)*";

// <low> rel <vars> rel <high>; ≤, < and = are all read as bound markers
static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"({NUMERAL})\s*[≤<=]\s*([A-Za-z](?:\s*,?\s*[A-Za-z])*)\s*[≤<=]\s*({NUMERAL})"
    ))
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeConstraint {
    pub low: i64,
    pub high: i64,
    pub size: i64,
}

impl RangeConstraint {
    /// `None` when `high - low + 1` overflows.
    pub fn new(low: i64, high: i64) -> Option<Self> {
        let size = high.checked_sub(low)?.checked_add(1)?;
        Some(RangeConstraint { low, high, size })
    }
}

/// Scan `text` for `low ≤ vars ≤ high` constraints and attribute them to the
/// known `variables`.
///
/// A later constraint on the same variable replaces the earlier one. A match
/// whose bounds do not both parse is dropped as a whole.
pub fn extract_ranges(text: &str, variables: &BTreeSet<char>) -> BTreeMap<char, RangeConstraint> {
    let mut ranges = BTreeMap::new();

    for caps in RANGE_RE.captures_iter(text) {
        let (low_raw, vars, high_raw) = (&caps[1], &caps[2], &caps[3]);

        let range = match (parse_number(low_raw), parse_number(high_raw)) {
            (Ok(low), Ok(high)) => RangeConstraint::new(low, high),
            (Err(e), _) | (_, Err(e)) => {
                debug!(candidate = &caps[0], error = %e, "skipping range candidate");
                continue;
            }
        };
        let Some(range) = range else {
            debug!(candidate = &caps[0], "range size overflows");
            continue;
        };

        // only whole one-letter tokens; `len` or `and b` name no variable
        let tokens = vars
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty());
        for token in tokens {
            let mut chars = token.chars();
            if let (Some(var), None) = (chars.next(), chars.next()) {
                if variables.contains(&var) {
                    ranges.insert(var, range);
                }
            }
        }
    }

    ranges
}
