//! CI host capabilities.
//!
//! The [`Host`] trait is how a run reads its inputs, learns which pull
//! request triggered it, and reports progress and failure. The
//! [`StatusReporter`] trait publishes commit statuses on the host's
//! repository.

mod actions;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::ConfigError;

pub use actions::{escape_data, input_variable, ActionsHost};

/// The pull request that triggered the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestContext {
    /// Pull request number, when the payload carries one.
    pub number: Option<u64>,
    /// Description text; empty when the pull request has none.
    pub body: String,
    /// Head commit sha.
    pub head_sha: String,
}

/// An `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryRef {
    pub owner: String,
    pub repo: String,
}

impl RepositoryRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self { owner: owner.into(), repo: repo.into() }
    }

    /// Parse `owner/repo`.
    pub fn parse(slug: &str) -> Option<Self> {
        let (owner, repo) = slug.trim().split_once('/')?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return None;
        }
        Some(Self::new(owner, repo))
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// CI host: inputs, pull request context and run reporting.
pub trait Host: Send + Sync {
    /// Read an input. Empty values count as absent.
    fn input(&self, name: &str) -> Option<String>;

    /// Log an informational line.
    fn info(&self, message: &str);

    /// Log a warning.
    fn warning(&self, message: &str);

    /// Log an error without failing the run.
    fn error(&self, message: &str);

    /// Mark the run as failed.
    fn set_failed(&self, message: &str);

    /// Publish a named output value.
    fn set_output(&self, name: &str, value: &str);

    /// The triggering pull request.
    fn pull_request(&self) -> Option<&PullRequestContext>;

    /// The repository the run belongs to.
    fn repository(&self) -> Option<&RepositoryRef>;

    /// Read an input that must be present.
    fn required_input(&self, name: &str) -> Result<String, ConfigError> {
        self.input(name).ok_or_else(|| ConfigError::MissingInput(name.to_string()))
    }

    /// Read a boolean input; only the literal `true` is true.
    fn flag_input(&self, name: &str) -> bool {
        self.input(name).is_some_and(|value| value == "true")
    }
}

/// Commit status states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Success,
    Error,
    Failure,
    Pending,
}

impl CommitState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Failure => "failure",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for CommitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status to attach to a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitStatus {
    pub state: CommitState,
    pub context: String,
    pub description: String,
}

impl CommitStatus {
    pub fn new(
        state: CommitState,
        context: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self { state, context: context.into(), description: description.into() }
    }
}

/// Result type for commit status operations.
pub type StatusResult<T> = Result<T, StatusError>;

/// Error types for commit status operations.
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error: {message} (status: {status})")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Publishes commit statuses.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    /// Create or overwrite the status named `status.context` on `sha`.
    async fn create_status(
        &self,
        repository: &RepositoryRef,
        sha: &str,
        status: &CommitStatus,
    ) -> StatusResult<()>;
}

/// Status reporter that only logs, for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingStatusReporter;

#[async_trait]
impl StatusReporter for LoggingStatusReporter {
    async fn create_status(
        &self,
        repository: &RepositoryRef,
        sha: &str,
        status: &CommitStatus,
    ) -> StatusResult<()> {
        tracing::info!(
            repository = %repository,
            sha,
            state = %status.state,
            context = %status.context,
            "[dry run] would create commit status"
        );
        Ok(())
    }
}
