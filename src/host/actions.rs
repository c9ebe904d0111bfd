//! GitHub Actions host.
//!
//! Inputs come from `INPUT_<NAME>` environment variables, the pull request
//! from the event payload at `GITHUB_EVENT_PATH`, and the repository from
//! `GITHUB_REPOSITORY`. Log lines are written to stdout as workflow
//! commands.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;

use super::{Host, PullRequestContext, RepositoryRef};
use crate::core::ConfigError;

/// Environment variable holding a given input.
///
/// Spaces become underscores and the name is upper-cased; hyphens are kept,
/// so `comment-id` is read from `INPUT_COMMENT-ID`.
pub fn input_variable(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

/// Escape a message for use in a workflow command.
pub fn escape_data(message: &str) -> String {
    message.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

#[derive(Deserialize)]
struct EventPayload {
    pull_request: Option<PullRequestPayload>,
}

#[derive(Deserialize)]
struct PullRequestPayload {
    number: Option<u64>,
    body: Option<String>,
    head: HeadPayload,
}

#[derive(Deserialize)]
struct HeadPayload {
    sha: String,
}

fn load_pull_request(path: &Path) -> Result<Option<PullRequestContext>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::InvalidEventPayload(format!("cannot read {}: {}", path.display(), e))
    })?;
    let payload: EventPayload = serde_json::from_str(&raw)
        .map_err(|e| ConfigError::InvalidEventPayload(format!("{}: {}", path.display(), e)))?;

    Ok(payload.pull_request.map(|pr| PullRequestContext {
        number: pr.number,
        body: pr.body.unwrap_or_default(),
        head_sha: pr.head.sha,
    }))
}

/// Host backed by the GitHub Actions runner environment.
#[derive(Debug)]
pub struct ActionsHost {
    /// Snapshot of the process environment.
    env: HashMap<String, String>,
    /// Inputs supplied on the command line; these win over the environment.
    overrides: HashMap<String, String>,
    pull_request: Option<PullRequestContext>,
    repository: Option<RepositoryRef>,
    output_path: Option<PathBuf>,
    failed: AtomicBool,
}

impl ActionsHost {
    /// Build a host from the current process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Build a host from explicit environment variables.
    pub fn from_vars(
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ConfigError> {
        let env: HashMap<String, String> = vars.into_iter().collect();

        let pull_request = match env.get("GITHUB_EVENT_PATH").filter(|p| !p.is_empty()) {
            Some(path) => load_pull_request(Path::new(path))?,
            None => None,
        };
        let repository = env.get("GITHUB_REPOSITORY").and_then(|slug| RepositoryRef::parse(slug));
        let output_path =
            env.get("GITHUB_OUTPUT").filter(|p| !p.is_empty()).map(PathBuf::from);

        Ok(Self {
            env,
            overrides: HashMap::new(),
            pull_request,
            repository,
            output_path,
            failed: AtomicBool::new(false),
        })
    }

    /// Override an input.
    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    /// Load the pull request from a different event payload file.
    pub fn with_event_path(mut self, path: &Path) -> Result<Self, ConfigError> {
        self.pull_request = load_pull_request(path)?;
        Ok(self)
    }

    /// Whether [`Host::set_failed`] has been called.
    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    fn append_output(&self, path: &Path, name: &str, value: &str) -> std::io::Result<()> {
        let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{name}<<{delimiter}\n{value}\n{delimiter}")
    }
}

impl Host for ActionsHost {
    fn input(&self, name: &str) -> Option<String> {
        self.overrides
            .get(name)
            .or_else(|| self.env.get(&input_variable(name)))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn warning(&self, message: &str) {
        println!("::warning::{}", escape_data(message));
    }

    fn error(&self, message: &str) {
        println!("::error::{}", escape_data(message));
    }

    fn set_failed(&self, message: &str) {
        self.failed.store(true, Ordering::SeqCst);
        self.error(message);
    }

    fn set_output(&self, name: &str, value: &str) {
        match &self.output_path {
            Some(path) => {
                if let Err(e) = self.append_output(path, name, value) {
                    tracing::warn!(output = name, error = %e, "Failed to write step output");
                }
            }
            None => tracing::debug!(output = name, value, "GITHUB_OUTPUT not set; output dropped"),
        }
    }

    fn pull_request(&self) -> Option<&PullRequestContext> {
        self.pull_request.as_ref()
    }

    fn repository(&self) -> Option<&RepositoryRef> {
        self.repository.as_ref()
    }
}
