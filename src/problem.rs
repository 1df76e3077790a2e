use std::fmt;

use thiserror::Error;

pub const CODEFORCES_URL: &str = "https://codeforces.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProblemIdError {
    #[error("problem id {0:?} is not of the form <contest>_<index>")]
    MissingSeparator(String),
    #[error("problem id {0:?} has a non-numeric contest id")]
    BadContest(String),
    #[error("problem id {0:?} has an empty index")]
    EmptyIndex(String),
}

/// Problem identifier `<contestId>_<index>`, e.g. `1850_a`.
///
/// The contest id is stored without leading zeros so that `0001_a` and `1_a`
/// name the same problem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProblemId {
    contest: u32,
    index: String,
}

impl ProblemId {
    pub fn parse(raw: &str) -> Result<Self, ProblemIdError> {
        let (contest, index) = raw
            .trim()
            .split_once('_')
            .ok_or_else(|| ProblemIdError::MissingSeparator(raw.to_string()))?;
        let contest = contest
            .parse::<u32>()
            .map_err(|_| ProblemIdError::BadContest(raw.to_string()))?;
        if index.is_empty() {
            return Err(ProblemIdError::EmptyIndex(raw.to_string()));
        }
        Ok(ProblemId {
            contest,
            index: index.to_string(),
        })
    }

    pub fn url(&self) -> String {
        self.url_on(CODEFORCES_URL)
    }

    /// Statement URL under an arbitrary mirror base.
    pub fn url_on(&self, base: &str) -> String {
        format!(
            "{}/contest/{}/problem/{}",
            base.trim_end_matches('/'),
            self.contest,
            self.index
        )
    }
}

impl fmt::Display for ProblemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.contest, self.index)
    }
}
