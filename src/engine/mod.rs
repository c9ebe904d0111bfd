//! Action engine.
//!
//! One handler per action kind. Every handler walks the parsed references
//! in order, talks to the tracker through [`TaskClient`], logs through the
//! [`Host`], and returns the identifiers it processed. Failures that concern
//! a single reference are logged and skipped; a handler never aborts the
//! remaining references.

mod assert_link;
mod comments;
mod complete;
mod custom_field;
mod move_section;

use serde::Serialize;

use crate::host::{CommitState, Host};
use crate::tracker::TaskClient;

pub use assert_link::{assert_link, link_state, LINK_STATUS_CONTEXT};
pub use custom_field::{resolve_value, FieldUpdate, FieldUpdateError};
pub use move_section::MoveOutcome;

/// How many stories are scanned when looking for a marked comment.
pub const COMMENT_SCAN_LIMIT: usize = 200;

/// Field written by the deprecated `change-task-progress` action.
pub const TASK_PROGRESS_FIELD: &str = "Task Progress";

/// What one action run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ActionOutcome {
    /// State of the link-presence commit status.
    Status(CommitState),
    /// Gids of created comments.
    Comments(Vec<String>),
    /// Gids of deleted comments.
    RemovedComments(Vec<String>),
    /// Ids of processed tasks.
    Tasks(Vec<String>),
}

impl ActionOutcome {
    /// The identifiers in the result list; empty for a status.
    pub fn items(&self) -> &[String] {
        match self {
            Self::Status(_) => &[],
            Self::Comments(ids) | Self::RemovedComments(ids) | Self::Tasks(ids) => ids,
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Render as the `result` step output.
    pub fn to_output(&self) -> String {
        match self {
            Self::Status(state) => state.as_str().to_string(),
            _ => serde_json::to_string(self.items()).unwrap_or_else(|_| "[]".to_string()),
        }
    }
}

/// Runs action handlers against one tracker and host.
#[derive(Clone, Copy)]
pub struct ActionEngine<'a> {
    client: &'a dyn TaskClient,
    host: &'a dyn Host,
}

impl<'a> ActionEngine<'a> {
    pub fn new(client: &'a dyn TaskClient, host: &'a dyn Host) -> Self {
        Self { client, host }
    }
}
