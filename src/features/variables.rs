use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

// "A." at the very start is the problem label, not a variable
static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z]\.").unwrap());
static SINGLE_LETTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[\s(.,;:])([a-zA-Z])(?:[\s).,;:]|$)").unwrap());

/// Distinct single-letter tokens (case-sensitive) that stand alone between
/// whitespace or punctuation.
///
/// The scan is non-overlapping: the delimiter consumed after one letter is not
/// available as the leading delimiter of the next, so in `n m k` only `n` and
/// `k` are found.
pub fn extract_variables(text: &str) -> BTreeSet<char> {
    if text.is_empty() {
        return BTreeSet::new();
    }
    let body = LABEL_RE.replace(text, "");
    let body = body.trim_start();

    SINGLE_LETTER_RE
        .captures_iter(body)
        .filter_map(|caps| caps[1].chars().next())
        .collect()
}
