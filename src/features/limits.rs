use std::sync::LazyLock;

use regex::Regex;

static TIME_LIMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"time limit per test\s*(\d+)").unwrap());
static MEMORY_LIMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"memory limit per test\s*(\d+)").unwrap());

/// Leading integer after "time limit per test" (seconds on Codeforces).
pub fn time_limit(text: &str) -> Option<u32> {
    first_number_after(&TIME_LIMIT_RE, text)
}

/// Leading integer after "memory limit per test" (megabytes on Codeforces).
pub fn memory_limit(text: &str) -> Option<u32> {
    first_number_after(&MEMORY_LIMIT_RE, text)
}

fn first_number_after(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text).and_then(|c| c[1].parse().ok())
}
