pub mod bins;
pub mod limits;
pub mod number;
pub mod operators;
pub mod ranges;
pub mod record;
pub mod variables;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::problem::ProblemId;
use bins::{compute_bin, BinCounts};
use operators::OperatorMatcher;
pub use record::FeatureRecord;

static DIGIT_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

const DEFAULT_OPERATORS: &[&str] = &[
    "+", "-", "*", "/", "%", "//", "^", "&", "|", "<<", ">>", "·", "xor", "mod",
];

/// Named size bucket; `upper: None` is unbounded and must come last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinSpec {
    pub name: String,
    pub upper: Option<i64>,
}

impl BinSpec {
    fn new(name: &str, upper: Option<i64>) -> Self {
        BinSpec {
            name: name.to_string(),
            upper,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one size bucket is required")]
    NoBins,
    #[error("bucket {0:?} must have a larger upper bound than the one before it")]
    NotAscending(String),
    #[error("unbounded bucket {0:?} must be the last one")]
    UnboundedNotLast(String),
    #[error("bucket name {0:?} is used twice")]
    DuplicateName(String),
}

/// Operator vocabulary and bucket thresholds used by [`FeatureExtractor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub operators: Vec<String>,
    pub bins: Vec<BinSpec>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            operators: DEFAULT_OPERATORS.iter().map(|s| s.to_string()).collect(),
            bins: vec![
                BinSpec::new("bin_≤26", Some(26)),
                BinSpec::new("bin_27_500", Some(500)),
                BinSpec::new("bin_501_5000", Some(5000)),
                BinSpec::new("bin_5001_1e6", Some(1_000_000)),
                BinSpec::new("bin_large", None),
            ],
        }
    }
}

impl FeatureConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bins.is_empty() {
            return Err(ConfigError::NoBins);
        }
        let mut prev: Option<i64> = None;
        for (i, bin) in self.bins.iter().enumerate() {
            if self.bins[..i].iter().any(|b| b.name == bin.name) {
                return Err(ConfigError::DuplicateName(bin.name.clone()));
            }
            match bin.upper {
                None if i + 1 != self.bins.len() => {
                    return Err(ConfigError::UnboundedNotLast(bin.name.clone()));
                }
                Some(upper) if prev.is_some_and(|p| upper <= p) || upper <= 0 => {
                    return Err(ConfigError::NotAscending(bin.name.clone()));
                }
                _ => {}
            }
            prev = bin.upper;
        }
        Ok(())
    }
}

/// Canonical statement text → [`FeatureRecord`].
///
/// Holds only the immutable configuration, so one instance can be shared
/// across threads.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: FeatureConfig,
    operators: Vec<OperatorMatcher>,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let operators = operators::compile(&config.operators);
        Ok(FeatureExtractor { config, operators })
    }

    pub fn extract(
        &self,
        id: &ProblemId,
        text: &str,
        tags: &[String],
        complexity_counts: &BTreeMap<String, u32>,
    ) -> FeatureRecord {
        let variables = variables::extract_variables(text);
        let ranges = ranges::extract_ranges(text, &variables);

        let mut bins = BinCounts::zeroed(&self.config.bins);
        for range in ranges.values() {
            if let Some(name) = compute_bin(&self.config.bins, range.size) {
                bins.increment(name);
            }
        }

        FeatureRecord {
            problem_id: id.to_string(),
            problem_url: id.url(),
            time_limit: limits::time_limit(text),
            memory_limit: limits::memory_limit(text),
            word_count: text.split_whitespace().count(),
            num_numbers: DIGIT_RUN_RE.find_iter(text).count(),
            num_operations: operators::count_operations(text, &self.operators),
            num_unique_variables: variables.len(),
            bins,
            tags: tags.to_vec(),
            complexity_counts: complexity_counts.clone(),
        }
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        let config = FeatureConfig::default();
        let operators = operators::compile(&config.operators);
        FeatureExtractor { config, operators }
    }
}
