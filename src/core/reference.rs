//! Task reference extraction from pull request descriptions.
//!
//! A reference is a trigger phrase at the start of a line, followed by an
//! Asana task URL, optionally followed on a later line by a checked
//! `- [x] close on merge` box:
//!
//! ```text
//! **Asana Task:**
//! https://app.asana.com/0/1200000000000001/1200000000000042
//!
//! - [x] close on merge
//! ```
//!
//! Parsing runs in two stages. Candidate URLs anchored to the trigger phrase
//! are located first; the text following each candidate is then inspected
//! for the checkbox marker.

use std::borrow::Cow;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Task URL shape: `https://app.asana.com/<workspace>/<project>/<task>`.
///
/// The task id is the run of digits after `<project>/`; anything following it
/// (punctuation, a query string) ends the match. An empty run is reported.
const TASK_URL: &str =
    r"https://app\.asana\.com/(?P<workspace>\d+)/(?P<project>\d+)(?:/(?P<task>\d*))?";

/// Checked close-on-merge box. Only whitespace may separate the end of the
/// URL's line from the box, and the box must start a line.
static CLOSE_ON_MERGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\A[^\n]*\s*(?m:^)-\s\[x\]\s*close on merge")
        .expect("close-on-merge pattern is valid")
});

/// Text that must precede a task URL at the start of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerPhrase {
    /// Matched verbatim; pattern metacharacters are escaped.
    Literal(String),
    /// Passed through to the matcher as a regular expression.
    Pattern(String),
}

impl Default for TriggerPhrase {
    fn default() -> Self {
        Self::Literal(String::new())
    }
}

impl TriggerPhrase {
    /// Create a literal trigger phrase.
    pub fn literal(phrase: impl Into<String>) -> Self {
        Self::Literal(phrase.into())
    }

    /// Create a trigger phrase interpreted as a regular expression.
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::Pattern(pattern.into())
    }

    /// The raw phrase as configured.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(phrase) | Self::Pattern(phrase) => phrase,
        }
    }

    /// The phrase as a regex fragment.
    pub fn to_pattern(&self) -> Cow<'_, str> {
        match self {
            Self::Literal(phrase) => Cow::Owned(regex::escape(phrase)),
            Self::Pattern(pattern) => Cow::Borrowed(pattern),
        }
    }
}

/// A task mentioned in a pull request description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReference {
    /// Asana task gid.
    pub task_id: String,
    /// Whether the author ticked the close-on-merge box.
    pub close_on_merge: bool,
}

impl TaskReference {
    /// Create a reference.
    pub fn new(task_id: impl Into<String>, close_on_merge: bool) -> Self {
        Self { task_id: task_id.into(), close_on_merge }
    }
}

/// A candidate URL that was dropped because its task id was unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceWarning {
    /// The matched URL text.
    pub url: String,
    /// Byte offset of the match in the body.
    pub offset: usize,
}

impl fmt::Display for ReferenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid Asana task URL after the trigger phrase: {}", self.url)
    }
}

/// Result of parsing one body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    /// References in order of appearance.
    pub references: Vec<TaskReference>,
    /// Matches that were dropped.
    pub warnings: Vec<ReferenceWarning>,
}

impl ParseOutcome {
    /// Task ids in order of appearance.
    pub fn task_ids(&self) -> Vec<&str> {
        self.references.iter().map(|r| r.task_id.as_str()).collect()
    }
}

/// Compiled matcher for one trigger phrase.
#[derive(Debug, Clone)]
pub struct ReferenceParser {
    trigger: TriggerPhrase,
    candidate: Regex,
}

impl ReferenceParser {
    /// Compile a parser for the given trigger phrase.
    ///
    /// Fails only when a [`TriggerPhrase::Pattern`] is not a valid regex.
    pub fn new(trigger: TriggerPhrase) -> Result<Self, regex::Error> {
        let pattern = format!(r"(?m)^(?:{})\s*{}", trigger.to_pattern(), TASK_URL);
        let candidate = Regex::new(&pattern)?;
        Ok(Self { trigger, candidate })
    }

    /// The trigger phrase this parser was built for.
    pub fn trigger(&self) -> &TriggerPhrase {
        &self.trigger
    }

    /// Extract every reference from `body`.
    pub fn parse(&self, body: &str) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();

        for caps in self.candidate.captures_iter(body) {
            let Some(whole) = caps.get(0) else { continue };

            let task_id = caps.name("task").map_or("", |m| m.as_str());
            if task_id.is_empty() {
                let offset = whole.start() + whole.as_str().find("https://").unwrap_or(0);
                let rest = &body[offset..];
                let url = rest.split(char::is_whitespace).next().unwrap_or(rest);
                outcome.warnings.push(ReferenceWarning { url: url.to_string(), offset });
                continue;
            }

            let close_on_merge = CLOSE_ON_MERGE.is_match(&body[whole.end()..]);
            outcome.references.push(TaskReference::new(task_id, close_on_merge));
        }

        outcome
    }
}

/// Extract references from `body` using `trigger`.
pub fn parse_references(
    body: &str,
    trigger: &TriggerPhrase,
) -> Result<Vec<TaskReference>, regex::Error> {
    Ok(ReferenceParser::new(trigger.clone())?.parse(body).references)
}
