//! Dispatcher: from host inputs to one action run.

use async_trait::async_trait;

use crate::core::{ActionConfig, ConfigError, RunSettings};
use crate::engine::{assert_link, ActionEngine, ActionOutcome};
use crate::host::{
    Host, LoggingStatusReporter, StatusError, StatusReporter, StatusResult,
};
use crate::integrations::{AsanaClient, GitHubStatuses};
use crate::tracker::{DryRunClient, TaskClient, TrackerError, TrackerResult};

/// Name of the step output carrying the run's result.
pub const RESULT_OUTPUT: &str = "result";

/// Errors that fail the whole run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("client authorization failed: {0}")]
    Authentication(#[source] TrackerError),

    #[error("cannot create commit status client: {0}")]
    StatusClient(#[source] StatusError),
}

/// Builds the remote clients a run needs.
#[async_trait]
pub trait Backends: Send + Sync {
    /// A working tracker client for `token`.
    async fn tracker(&self, token: &str) -> TrackerResult<Box<dyn TaskClient>>;

    /// A commit status client for `host_token`.
    fn statuses(&self, host_token: &str) -> StatusResult<Box<dyn StatusReporter>>;
}

/// Backends talking to Asana and GitHub.
#[derive(Debug, Clone, Default)]
pub struct LiveBackends {
    /// Log mutations instead of performing them.
    dry_run: bool,
    /// GitHub API root override.
    github_api_url: Option<String>,
}

impl LiveBackends {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run, github_api_url: None }
    }

    pub fn with_github_api_url(mut self, url: Option<String>) -> Self {
        self.github_api_url = url.filter(|u| !u.is_empty());
        self
    }
}

#[async_trait]
impl Backends for LiveBackends {
    async fn tracker(&self, token: &str) -> TrackerResult<Box<dyn TaskClient>> {
        let client = AsanaClient::connect(token).await?;
        if self.dry_run {
            Ok(Box::new(DryRunClient::new(client)))
        } else {
            Ok(Box::new(client))
        }
    }

    fn statuses(&self, host_token: &str) -> StatusResult<Box<dyn StatusReporter>> {
        if self.dry_run {
            return Ok(Box::new(LoggingStatusReporter));
        }
        let mut client = GitHubStatuses::new(host_token)?;
        if let Some(url) = &self.github_api_url {
            client = client.with_base_url(url.as_str());
        }
        Ok(Box::new(client))
    }
}

/// Resolve every input the selected action needs.
pub fn resolve_settings<H: Host + ?Sized>(host: &H) -> Result<RunSettings, ConfigError> {
    RunSettings::from_host(host)
}

/// Run the configured action and publish its result.
pub async fn run(host: &dyn Host, backends: &dyn Backends) -> Result<ActionOutcome, RunError> {
    let settings = resolve_settings(host)?;
    tracing::debug!(?settings, "Resolved settings");

    let pull_request = host.pull_request().ok_or(ConfigError::MissingPullRequest)?;
    let status = match &settings.action {
        ActionConfig::AssertLink { host_token, .. } => {
            let repository = host.repository().ok_or(ConfigError::MissingRepository)?;
            let reporter = backends.statuses(host_token).map_err(RunError::StatusClient)?;
            Some((repository, reporter))
        }
        _ => None,
    };
    let client = backends.tracker(&settings.token).await.map_err(RunError::Authentication)?;

    let parsed = settings.parser.parse(&pull_request.body);
    for warning in &parsed.warnings {
        host.error(&warning.to_string());
    }
    host.info(&format!(
        "found {} taskIds: {}",
        parsed.references.len(),
        parsed.task_ids().join(", ")
    ));

    let references = parsed.references;
    let engine = ActionEngine::new(client.as_ref(), host);
    host.info(&format!("calling {}", settings.action.kind()));

    let outcome = match &settings.action {
        ActionConfig::AssertLink { link_required, .. } => {
            let (repository, reporter) = status.ok_or(ConfigError::MissingRepository)?;
            let state = assert_link(
                host,
                reporter.as_ref(),
                repository,
                &pull_request.head_sha,
                *link_required,
                &references,
            )
            .await;
            ActionOutcome::Status(state)
        }
        ActionConfig::AddComment { comment_id, text, is_pinned } => ActionOutcome::Comments(
            engine.add_comment(&references, comment_id.as_deref(), text, *is_pinned).await,
        ),
        ActionConfig::RemoveComment { comment_id } => {
            ActionOutcome::RemovedComments(engine.remove_comment(&references, comment_id).await)
        }
        ActionConfig::CompleteTask { is_complete } => {
            ActionOutcome::Tasks(engine.complete_tasks(&references, *is_complete).await)
        }
        ActionConfig::MoveSection { targets } => {
            ActionOutcome::Tasks(engine.move_sections(&references, targets).await)
        }
        ActionConfig::UpdateCustomField { field_name, content } => {
            ActionOutcome::Tasks(engine.update_custom_field(&references, field_name, content).await)
        }
        ActionConfig::ChangeTaskProgress { state } => {
            ActionOutcome::Tasks(engine.change_task_progress(&references, state).await)
        }
    };

    tracing::debug!(action = %settings.action.kind(), items = outcome.len(), "Action finished");
    host.set_output(RESULT_OUTPUT, &outcome.to_output());
    Ok(outcome)
}

/// [`run`], reporting a fatal error through [`Host::set_failed`].
pub async fn run_and_report(host: &dyn Host, backends: &dyn Backends) -> Option<ActionOutcome> {
    match run(host, backends).await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            host.set_failed(&e.to_string());
            None
        }
    }
}
