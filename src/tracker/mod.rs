//! Task tracker facade.
//!
//! [`TaskClient`] is the only way the action engine talks to Asana. The
//! engine never caches what it reads: every decision is made on a fresh
//! fetch immediately before the write it guards.

mod dry_run;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::Retryable;

pub use dry_run::DryRunClient;

/// Result type for task tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Error types for task tracker operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Asana API error: {message} (status: {status})")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl TrackerError {
    /// Whether the server certainly did not act on the request.
    pub fn is_unprocessed(&self) -> bool {
        match self {
            Self::Http(err) => err.is_connect(),
            Self::RateLimited { .. } => true,
            _ => false,
        }
    }
}

impl Retryable for TrackerError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => err.is_timeout() || err.is_connect(),
            Self::Api { status, .. } => *status >= 500,
            Self::RateLimited { .. } => true,
            Self::NotFound(_) | Self::Unauthorized | Self::InvalidResponse(_) => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A task as currently stored in the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTask {
    /// Task gid
    pub gid: String,
    /// Completion state
    #[serde(default)]
    pub completed: bool,
    /// Projects the task belongs to
    #[serde(default, deserialize_with = "null_as_default")]
    pub projects: Vec<ProjectRef>,
    /// Section placement per project
    #[serde(default, deserialize_with = "null_as_default")]
    pub memberships: Vec<Membership>,
    /// Custom field values
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_fields: Vec<CustomField>,
}

impl RemoteTask {
    /// Find a project membership by exact name.
    pub fn project_named(&self, name: &str) -> Option<&ProjectRef> {
        self.projects.iter().find(|project| project.name == name)
    }

    /// The section the task sits in within `project_gid`, if known.
    pub fn section_in(&self, project_gid: &str) -> Option<&Section> {
        self.memberships
            .iter()
            .find(|m| m.project.gid == project_gid)
            .and_then(|m| m.section.as_ref())
    }

    /// Find a custom field by exact name.
    pub fn custom_field(&self, name: &str) -> Option<&CustomField> {
        self.custom_fields.iter().find(|field| field.name == name)
    }
}

/// A project reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub gid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// A section within a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub gid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// Where a task sits within one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub project: ProjectRef,
    #[serde(default)]
    pub section: Option<Section>,
}

/// Custom field types the engine distinguishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomFieldType {
    Text,
    Number,
    /// Single-select
    Enum,
    /// Multi-select
    MultiEnum,
    #[default]
    #[serde(other)]
    Other,
}

/// A custom field definition together with the task's current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    /// Field gid
    pub gid: String,
    /// Field name
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Field type
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub field_type: CustomFieldType,
    /// Current value rendered as text
    #[serde(default)]
    pub display_value: Option<String>,
    /// Options of (multi-)select fields
    #[serde(default, deserialize_with = "null_as_default")]
    pub enum_options: Vec<EnumOption>,
}

impl CustomField {
    /// Find a select option by exact name.
    pub fn enum_option(&self, name: &str) -> Option<&EnumOption> {
        self.enum_options.iter().find(|option| option.name == name)
    }
}

/// One option of a select field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumOption {
    pub gid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// An activity entry on a task; comments are stories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub gid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
}

/// A comment to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewComment {
    pub text: String,
    pub is_pinned: bool,
}

impl NewComment {
    pub fn new(text: impl Into<String>, is_pinned: bool) -> Self {
        Self { text: text.into(), is_pinned }
    }
}

/// A value to write into a custom field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CustomFieldValue {
    Text(String),
    Number(f64),
    /// Gid of a single-select option
    EnumOption(String),
    /// Gids of multi-select options
    EnumOptions(Vec<String>),
}

/// Field changes for one task update. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// Custom field gid to new value
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, CustomFieldValue>,
}

impl TaskUpdate {
    /// An update that only sets the completion state.
    pub fn completed(completed: bool) -> Self {
        Self { completed: Some(completed), ..Default::default() }
    }

    /// Add a custom field value to the update.
    pub fn with_custom_field(mut self, gid: impl Into<String>, value: CustomFieldValue) -> Self {
        self.custom_fields.insert(gid.into(), value);
        self
    }
}

/// Remote task tracker operations used by the action engine.
#[async_trait]
pub trait TaskClient: Send + Sync {
    /// Fetch a task with its projects, memberships and custom fields.
    async fn fetch_task(&self, task_id: &str) -> TrackerResult<RemoteTask>;

    /// List every section of a project.
    async fn list_sections(&self, project_gid: &str) -> TrackerResult<Vec<Section>>;

    /// List up to `limit` stories of a task, oldest first.
    async fn list_stories(&self, task_id: &str, limit: usize) -> TrackerResult<Vec<Story>>;

    /// Post a comment on a task.
    async fn add_comment(&self, task_id: &str, comment: &NewComment) -> TrackerResult<Story>;

    /// Delete a story by gid.
    async fn delete_story(&self, story_gid: &str) -> TrackerResult<()>;

    /// Apply field changes to a task.
    async fn update_task(&self, task_id: &str, update: &TaskUpdate) -> TrackerResult<()>;

    /// Put a task into a section, leaving any other section of that project.
    async fn add_task_to_section(&self, section_gid: &str, task_id: &str) -> TrackerResult<()>;
}
