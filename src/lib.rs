//! # tasklink
//!
//! Links GitHub pull requests to Asana tasks.
//!
//! A CI run reads the pull request description, finds the Asana task URLs
//! that follow a configured trigger phrase, and runs one action against
//! those tasks: comment on them, complete them, move them between sections,
//! set a custom field, or report on the commit whether a task was linked at
//! all.
//!
//! ## Layout
//!
//! - [`core`]: reference parsing, configuration, retry handling
//! - [`tracker`]: the [`TaskClient`] capability the engine mutates tasks through
//! - [`host`]: the [`Host`] capability (inputs, logging, pull request context)
//! - [`engine`]: one handler per action
//! - [`dispatch`]: resolves inputs and runs the selected handler
//! - [`integrations`]: Asana and GitHub clients
//!
//! ## Quick Start
//!
//! ```yaml
//! - uses: tasklink
//!   with:
//!     task-tracker-token: ${{ secrets.ASANA_PAT }}
//!     trigger-phrase: "**Asana Task:**"
//!     action: add-comment
//!     comment-id: "#pr-${{ github.event.pull_request.number }}"
//!     text: "View pull request: ${{ github.event.pull_request.html_url }}"
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::significant_drop_tightening)]

pub mod core;
pub mod dispatch;
pub mod engine;
pub mod host;
pub mod integrations;
pub mod tracker;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use crate::core::{
    ActionConfig, ActionKind, ConfigError, MoveTarget, ParseOutcome, ReferenceParser, RunSettings,
    TaskReference, TriggerPhrase,
};
pub use dispatch::{run, run_and_report, Backends, LiveBackends, RunError};
pub use engine::{ActionEngine, ActionOutcome};
pub use host::{ActionsHost, Host, StatusReporter};
pub use integrations::{AsanaClient, GitHubStatuses};
pub use tracker::{TaskClient, TrackerError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "tasklink";
