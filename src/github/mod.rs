//! GitHub REST client with retry logic.

pub mod issues;

pub use issues::IssueClient;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::{MetricsError, Result};

const API_BASE: &str = "https://api.github.com";
const MAX_RETRIES: u32 = 3;
const BASE_RETRY_DELAY_MS: u64 = 1_000;
const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// Repository statistics used for project enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoStats {
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub open_issues: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    stargazers_count: u64,
    forks_count: u64,
    subscribers_count: Option<u64>,
    open_issues_count: u64,
    pushed_at: Option<DateTime<Utc>>,
}

/// GitHub API client. Authenticated when a token is supplied (explicitly or
/// via `GITHUB_TOKEN`), anonymous otherwise.
pub struct GitHubClient {
    client: Client,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MetricsError::Http(format!("failed to create HTTP client: {e}")))?;
        let token = token.or_else(|| std::env::var("GITHUB_TOKEN").ok());
        Ok(Self { client, token })
    }

    /// Fetch repository statistics for an `owner/repo` slug.
    pub async fn repo_stats(&self, slug: &str) -> Result<RepoStats> {
        let url = format!("{API_BASE}/repos/{slug}");
        let body: RepoResponse = self.get_with_retry(&url).await?;
        Ok(RepoStats {
            stars: body.stargazers_count,
            forks: body.forks_count,
            watchers: body.subscribers_count.unwrap_or(body.stargazers_count),
            open_issues: body.open_issues_count,
            pushed_at: body.pushed_at,
        })
    }

    pub(crate) fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", concat!("pymetra/", env!("CARGO_PKG_VERSION")));
        match &self.token {
            Some(token) => builder.header("Authorization", format!("Bearer {token}")),
            None => builder,
        }
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    async fn get_with_retry<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut attempt = 0;
        loop {
            match self.get_once(url).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= MAX_RETRIES || !is_retryable(&err) {
                        return Err(err);
                    }
                    attempt += 1;
                    let delay = backoff_delay(attempt);
                    warn!(url, attempt, delay_ms = delay.as_millis() as u64, error = %err,
                        "GitHub request failed, retrying");
                    sleep(delay).await;
                }
            }
        }
    }

    async fn get_once<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .request(self.client.get(url))
            .send()
            .await
            .map_err(|e| MetricsError::Http(format!("request to {url} failed: {e}")))?;

        match response.status() {
            StatusCode::OK => response
                .json()
                .await
                .map_err(|e| MetricsError::Http(format!("invalid response from {url}: {e}"))),
            StatusCode::TOO_MANY_REQUESTS => {
                Err(MetricsError::Http(format!("rate limited by {url}")))
            }
            StatusCode::NOT_FOUND => Err(MetricsError::Http(format!("{url} not found"))),
            status if status.is_server_error() => {
                Err(MetricsError::Http(format!("server error {status} from {url}")))
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(MetricsError::Http(format!("GitHub error {status}: {text}")))
            }
        }
    }
}

fn is_retryable(error: &MetricsError) -> bool {
    match error {
        MetricsError::Http(msg) => {
            msg.contains("rate limited") || msg.contains("server error") || msg.contains("timed")
        }
        _ => false,
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let ms = BASE_RETRY_DELAY_MS.saturating_mul(2_u64.saturating_pow(attempt - 1));
    Duration::from_millis(ms.min(MAX_RETRY_DELAY_MS))
}
