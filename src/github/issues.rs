//! Issue filing against the GitHub issues API.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{GitHubClient, API_BASE};
use crate::{MetricsError, Result};

/// A created or already-existing issue.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub html_url: String,
}

#[derive(Debug, Serialize)]
struct CreateIssueRequest<'a> {
    title: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    labels: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    assignees: Vec<String>,
}

/// Creates and looks up issues in one repository.
pub struct IssueClient<'a> {
    client: &'a GitHubClient,
    slug: String,
}

impl<'a> IssueClient<'a> {
    pub fn new(client: &'a GitHubClient, owner: &str, repo: &str) -> Self {
        Self {
            client,
            slug: format!("{owner}/{repo}"),
        }
    }

    /// File a new issue and return it.
    pub async fn create_issue(
        &self,
        title: &str,
        body: &str,
        labels: Vec<String>,
        assignees: Vec<String>,
    ) -> Result<Issue> {
        let url = format!("{API_BASE}/repos/{}/issues", self.slug);
        let request = CreateIssueRequest {
            title,
            body,
            labels,
            assignees,
        };
        let response = self
            .client
            .request(self.client.http().post(&url))
            .json(&request)
            .send()
            .await
            .map_err(|e| MetricsError::Http(format!("issue creation failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(MetricsError::Http(format!(
                "issue creation returned {status}: {text}"
            )));
        }
        let issue: Issue = response
            .json()
            .await
            .map_err(|e| MetricsError::Http(format!("invalid issue response: {e}")))?;
        info!(repo = %self.slug, number = issue.number, "issue created");
        Ok(issue)
    }

    /// Find an open issue with an exact title match, if any.
    pub async fn find_existing(&self, title: &str) -> Result<Option<Issue>> {
        let url = format!(
            "{API_BASE}/repos/{}/issues?state=open&per_page=100",
            self.slug
        );
        let response = self
            .client
            .request(self.client.http().get(&url))
            .send()
            .await
            .map_err(|e| MetricsError::Http(format!("issue lookup failed: {e}")))?;

        if !response.status().is_success() {
            return Err(MetricsError::Http(format!(
                "issue lookup returned {}",
                response.status()
            )));
        }
        let issues: Vec<Issue> = response
            .json()
            .await
            .map_err(|e| MetricsError::Http(format!("invalid issues response: {e}")))?;
        Ok(issues.into_iter().find(|issue| issue.title == title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_label_lists_are_omitted_from_the_payload() {
        let request = CreateIssueRequest {
            title: "Metric change alert",
            body: "body",
            labels: Vec::new(),
            assignees: Vec::new(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("labels").is_none());
        assert!(json.get("assignees").is_none());

        let request = CreateIssueRequest {
            title: "Metric change alert",
            body: "body",
            labels: vec!["metrics".to_string()],
            assignees: Vec::new(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["labels"][0], "metrics");
    }
}
