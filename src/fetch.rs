use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::warn;

use crate::db::ScrapeRow;
use crate::normalize::statement_html;
use crate::problem::ProblemId;
use crate::settings::Settings;

const BASE_BACKOFF_MS: u64 = 2000;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("page has no problem statement")]
    MissingStatement,
}

impl FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status(code) => *code == 429 || (500..600).contains(code),
            FetchError::Http(e) => e.is_timeout() || e.is_connect(),
            FetchError::MissingStatement => false,
        }
    }

    fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status(code) => Some(*code),
            _ => None,
        }
    }
}

/// `BASE_BACKOFF_MS * 2^attempt`, saturating instead of overflowing.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(2u64.saturating_pow(attempt)))
}

/// Downloads problem pages and cuts out the statement markup.
pub struct StatementFetcher {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl StatementFetcher {
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(StatementFetcher {
            client,
            base_url: settings.base_url.clone(),
            max_retries: settings.max_retries,
        })
    }

    pub fn url(&self, id: &ProblemId) -> String {
        id.url_on(&self.base_url)
    }

    /// Statement markup for one problem.
    pub async fn fetch(&self, id: &ProblemId) -> Result<String, FetchError> {
        let response = self.client.get(self.url(id)).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }
        let page = response.text().await?;
        statement_html(&page).ok_or(FetchError::MissingStatement)
    }

    /// [`fetch`](Self::fetch) with exponential backoff on rate limits, server
    /// errors and timeouts.
    pub async fn fetch_with_retry(&self, id: &ProblemId) -> Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetch(id).await {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let backoff = backoff_delay(attempt);
                    warn!(
                        "{} on {} (attempt {}/{}), backing off {:.1}s",
                        e,
                        id,
                        attempt + 1,
                        self.max_retries,
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Fetch and package the outcome as a row for the store; failures become
    /// rows with `error` set.
    pub async fn scrape(&self, id: &ProblemId) -> ScrapeRow {
        let start = Instant::now();
        let result = self.fetch_with_retry(id).await;
        let latency_ms = start.elapsed().as_millis() as i64;
        let url = self.url(id);

        match result {
            Ok(markup) => ScrapeRow {
                problem_id: id.to_string(),
                url,
                markup: Some(markup),
                status: Some(200),
                error: None,
                latency_ms: Some(latency_ms),
            },
            Err(e) => ScrapeRow {
                problem_id: id.to_string(),
                url,
                markup: None,
                status: e.status(),
                error: Some(e.to_string()),
                latency_ms: Some(latency_ms),
            },
        }
    }
}
