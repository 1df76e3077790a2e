use std::collections::BTreeMap;

use serde::Serialize;

use super::bins::BinCounts;

/// Fixed-schema feature row for one problem statement.
///
/// Every key is always serialized; missing limits come out as `null` and the
/// bucket counters default to 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    pub problem_id: String,
    pub problem_url: String,
    pub time_limit: Option<u32>,
    pub memory_limit: Option<u32>,
    pub word_count: usize,
    pub num_numbers: usize,
    pub num_operations: usize,
    pub num_unique_variables: usize,
    #[serde(flatten)]
    pub bins: BinCounts,
    pub tags: Vec<String>,
    pub complexity_counts: BTreeMap<String, u32>,
}
