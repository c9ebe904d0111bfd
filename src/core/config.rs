//! Run configuration.
//!
//! Every setting arrives as a named string input from the CI host. Inputs
//! are resolved into a typed [`ActionConfig`] before any remote client is
//! built, so a missing or malformed input fails the run before anything is
//! mutated.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::reference::{ReferenceParser, TriggerPhrase};
use crate::host::Host;

/// Input names understood by the bot.
pub mod inputs {
    /// Asana personal access token.
    pub const TRACKER_TOKEN: &str = "task-tracker-token";
    /// Older name of [`TRACKER_TOKEN`].
    pub const LEGACY_TRACKER_TOKEN: &str = "asana-pat";
    /// Action to run.
    pub const ACTION: &str = "action";
    /// Text preceding task URLs.
    pub const TRIGGER_PHRASE: &str = "trigger-phrase";
    /// Treat the trigger phrase as a regular expression.
    pub const TRIGGER_PHRASE_REGEX: &str = "trigger-phrase-regex";
    /// Fail the link check when no task is referenced.
    pub const LINK_REQUIRED: &str = "link-required";
    /// Token used to publish commit statuses.
    pub const HOST_TOKEN: &str = "host-token";
    /// Older name of [`HOST_TOKEN`].
    pub const LEGACY_HOST_TOKEN: &str = "github-token";
    /// Marker used to find a previously posted comment.
    pub const COMMENT_ID: &str = "comment-id";
    /// Comment text.
    pub const TEXT: &str = "text";
    /// Pin the created comment.
    pub const IS_PINNED: &str = "is-pinned";
    /// Completion state to set.
    pub const IS_COMPLETE: &str = "is-complete";
    /// JSON array of `{project, section}` objects.
    pub const TARGETS: &str = "targets";
    /// Custom field to update.
    pub const FIELD_NAME: &str = "field-name";
    /// Value to write into the custom field.
    pub const CONTENT: &str = "content";
    /// Task Progress value for the deprecated action.
    pub const STATE: &str = "state";
}

/// Configuration errors. All of them are fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Input required and not supplied: {0}")]
    MissingInput(String),

    #[error("unexpected action {0}")]
    UnknownAction(String),

    #[error("invalid move-section targets: {0}")]
    InvalidTargets(#[source] serde_json::Error),

    #[error("invalid trigger phrase pattern: {0}")]
    InvalidTriggerPattern(#[from] regex::Error),

    #[error("invalid event payload: {0}")]
    InvalidEventPayload(String),

    #[error("no pull request found in the event payload")]
    MissingPullRequest,

    #[error("repository is unknown; set GITHUB_REPOSITORY to owner/repo")]
    MissingRepository,
}

/// The closed set of actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    AssertLink,
    AddComment,
    RemoveComment,
    CompleteTask,
    MoveSection,
    UpdateCustomField,
    /// Deprecated in favour of [`ActionKind::MoveSection`].
    ChangeTaskProgress,
}

impl ActionKind {
    /// Every action, in documentation order.
    pub const ALL: [Self; 7] = [
        Self::AssertLink,
        Self::AddComment,
        Self::RemoveComment,
        Self::CompleteTask,
        Self::MoveSection,
        Self::UpdateCustomField,
        Self::ChangeTaskProgress,
    ];

    /// The input value naming this action.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AssertLink => "assert-link",
            Self::AddComment => "add-comment",
            Self::RemoveComment => "remove-comment",
            Self::CompleteTask => "complete-task",
            Self::MoveSection => "move-section",
            Self::UpdateCustomField => "update-custom-field",
            Self::ChangeTaskProgress => "change-task-progress",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownAction(s.to_string()))
    }
}

/// Where `move-section` should put a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveTarget {
    /// Project name, matched exactly against the task's projects.
    pub project: String,
    /// Section name, matched exactly against the project's sections.
    pub section: String,
}

impl MoveTarget {
    pub fn new(project: impl Into<String>, section: impl Into<String>) -> Self {
        Self { project: project.into(), section: section.into() }
    }
}

impl fmt::Display for MoveTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.section)
    }
}

/// Parse the `targets` input.
pub fn parse_targets(json: &str) -> Result<Vec<MoveTarget>, ConfigError> {
    serde_json::from_str(json).map_err(ConfigError::InvalidTargets)
}

/// Action-specific settings. Each variant carries only its own inputs.
#[derive(Clone, PartialEq, Eq)]
pub enum ActionConfig {
    AssertLink { link_required: bool, host_token: String },
    AddComment { comment_id: Option<String>, text: String, is_pinned: bool },
    RemoveComment { comment_id: String },
    CompleteTask { is_complete: bool },
    MoveSection { targets: Vec<MoveTarget> },
    UpdateCustomField { field_name: String, content: String },
    ChangeTaskProgress { state: String },
}

impl ActionConfig {
    /// Read the inputs `kind` needs from `host`.
    pub fn from_host<H: Host + ?Sized>(kind: ActionKind, host: &H) -> Result<Self, ConfigError> {
        let config = match kind {
            ActionKind::AssertLink => Self::AssertLink {
                link_required: host.required_input(inputs::LINK_REQUIRED)? == "true",
                host_token: host
                    .input(inputs::HOST_TOKEN)
                    .or_else(|| host.input(inputs::LEGACY_HOST_TOKEN))
                    .ok_or_else(|| ConfigError::MissingInput(inputs::HOST_TOKEN.to_string()))?,
            },
            ActionKind::AddComment => Self::AddComment {
                comment_id: host.input(inputs::COMMENT_ID),
                text: host.required_input(inputs::TEXT)?,
                is_pinned: host.flag_input(inputs::IS_PINNED),
            },
            ActionKind::RemoveComment => {
                Self::RemoveComment { comment_id: host.required_input(inputs::COMMENT_ID)? }
            }
            ActionKind::CompleteTask => {
                Self::CompleteTask { is_complete: host.flag_input(inputs::IS_COMPLETE) }
            }
            ActionKind::MoveSection => {
                let targets = parse_targets(&host.required_input(inputs::TARGETS)?)?;
                Self::MoveSection { targets }
            }
            ActionKind::UpdateCustomField => Self::UpdateCustomField {
                field_name: host.required_input(inputs::FIELD_NAME)?,
                content: host.required_input(inputs::CONTENT)?,
            },
            ActionKind::ChangeTaskProgress => {
                Self::ChangeTaskProgress { state: host.required_input(inputs::STATE)? }
            }
        };
        Ok(config)
    }

    /// The action this configuration belongs to.
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::AssertLink { .. } => ActionKind::AssertLink,
            Self::AddComment { .. } => ActionKind::AddComment,
            Self::RemoveComment { .. } => ActionKind::RemoveComment,
            Self::CompleteTask { .. } => ActionKind::CompleteTask,
            Self::MoveSection { .. } => ActionKind::MoveSection,
            Self::UpdateCustomField { .. } => ActionKind::UpdateCustomField,
            Self::ChangeTaskProgress { .. } => ActionKind::ChangeTaskProgress,
        }
    }
}

impl fmt::Debug for ActionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssertLink { link_required, .. } => f
                .debug_struct("AssertLink")
                .field("link_required", link_required)
                .field("host_token", &"<redacted>")
                .finish(),
            Self::AddComment { comment_id, text, is_pinned } => f
                .debug_struct("AddComment")
                .field("comment_id", comment_id)
                .field("text", text)
                .field("is_pinned", is_pinned)
                .finish(),
            Self::RemoveComment { comment_id } => {
                f.debug_struct("RemoveComment").field("comment_id", comment_id).finish()
            }
            Self::CompleteTask { is_complete } => {
                f.debug_struct("CompleteTask").field("is_complete", is_complete).finish()
            }
            Self::MoveSection { targets } => {
                f.debug_struct("MoveSection").field("targets", targets).finish()
            }
            Self::UpdateCustomField { field_name, content } => f
                .debug_struct("UpdateCustomField")
                .field("field_name", field_name)
                .field("content", content)
                .finish(),
            Self::ChangeTaskProgress { state } => {
                f.debug_struct("ChangeTaskProgress").field("state", state).finish()
            }
        }
    }
}

/// Everything one run needs, resolved from host inputs.
#[derive(Clone)]
pub struct RunSettings {
    /// Asana credential.
    pub token: String,
    /// Matcher built from the trigger phrase.
    pub parser: ReferenceParser,
    /// The selected action and its settings.
    pub action: ActionConfig,
}

impl RunSettings {
    /// Resolve settings from host inputs.
    ///
    /// The action is resolved first so that an unknown action is reported
    /// even when other inputs are missing.
    pub fn from_host<H: Host + ?Sized>(host: &H) -> Result<Self, ConfigError> {
        let kind: ActionKind = host.required_input(inputs::ACTION)?.parse()?;

        let token = host
            .input(inputs::TRACKER_TOKEN)
            .or_else(|| host.input(inputs::LEGACY_TRACKER_TOKEN))
            .ok_or_else(|| ConfigError::MissingInput(inputs::TRACKER_TOKEN.to_string()))?;

        let phrase = host.input(inputs::TRIGGER_PHRASE).unwrap_or_default();
        let trigger = if host.flag_input(inputs::TRIGGER_PHRASE_REGEX) {
            TriggerPhrase::pattern(phrase)
        } else {
            TriggerPhrase::literal(phrase)
        };
        let parser = ReferenceParser::new(trigger)?;

        let action = ActionConfig::from_host(kind, host)?;

        Ok(Self { token, parser, action })
    }
}

impl fmt::Debug for RunSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunSettings")
            .field("token", &"<redacted>")
            .field("trigger", self.parser.trigger())
            .field("action", &self.action)
            .finish()
    }
}
