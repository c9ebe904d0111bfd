//! GitHub commit statuses.

use std::time::Duration;

use async_trait::async_trait;

use crate::host::{CommitStatus, RepositoryRef, StatusError, StatusReporter, StatusResult};

/// Public GitHub REST API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub commit status client.
#[derive(Debug, Clone)]
pub struct GitHubStatuses {
    /// GitHub token
    token: String,
    /// API root, without trailing slash
    base_url: String,
    /// HTTP client
    client: reqwest::Client,
}

impl GitHubStatuses {
    /// Create a new client.
    pub fn new(token: impl Into<String>) -> StatusResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("tasklink/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { token: token.into(), base_url: DEFAULT_API_URL.to_string(), client })
    }

    /// Point the client at another API root, e.g. `GITHUB_API_URL` on GHES.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Parse error response from GitHub API.
    async fn parse_error(response: reqwest::Response) -> StatusError {
        let status = response.status().as_u16();

        match status {
            401 => StatusError::Unauthorized,
            403 => {
                if response
                    .headers()
                    .get("x-ratelimit-remaining")
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|s| s == "0")
                {
                    return StatusError::RateLimited;
                }
                StatusError::Api { status, message: "Forbidden".to_string() }
            }
            404 => StatusError::NotFound("Resource not found".to_string()),
            _ => {
                let message = response
                    .json::<serde_json::Value>()
                    .await
                    .ok()
                    .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                    .unwrap_or_else(|| format!("HTTP {}", status));
                StatusError::Api { status, message }
            }
        }
    }
}

#[async_trait]
impl StatusReporter for GitHubStatuses {
    async fn create_status(
        &self,
        repository: &RepositoryRef,
        sha: &str,
        status: &CommitStatus,
    ) -> StatusResult<()> {
        let url = format!(
            "{}/repos/{}/{}/statuses/{}",
            self.base_url, repository.owner, repository.repo, sha
        );
        tracing::debug!(%url, state = %status.state, "Creating commit status");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .json(status)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::parse_error(response).await)
        }
    }
}
