//! `assert-link`: report whether the pull request references a task.

use crate::core::TaskReference;
use crate::host::{CommitState, CommitStatus, Host, RepositoryRef, StatusReporter};

/// Commit status context owned by the link check.
pub const LINK_STATUS_CONTEXT: &str = "asana-link-presence";

/// Pass unless a link is required and none was found.
pub fn link_state(link_required: bool, reference_count: usize) -> CommitState {
    if !link_required || reference_count > 0 {
        CommitState::Success
    } else {
        CommitState::Error
    }
}

/// Publish the link-presence status on `sha` and return its state.
///
/// A failure to publish is logged; it does not fail the run.
pub async fn assert_link(
    host: &dyn Host,
    status: &dyn StatusReporter,
    repository: &RepositoryRef,
    sha: &str,
    link_required: bool,
    references: &[TaskReference],
) -> CommitState {
    let state = link_state(link_required, references.len());
    let description =
        if references.is_empty() { "asana link not found" } else { "asana link found" };

    host.info(&format!("setting {state} for {sha}"));
    let commit_status = CommitStatus::new(state, LINK_STATUS_CONTEXT, description);
    if let Err(e) = status.create_status(repository, sha, &commit_status).await {
        host.error(&format!("Failed to set {LINK_STATUS_CONTEXT} status on {sha}: {e}"));
    }

    state
}
