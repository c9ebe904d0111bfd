//! Core types and functionality for tasklink.
//!
//! This module contains the fundamental pieces used throughout the crate:
//! task reference extraction, run configuration, and retry handling.

mod config;
mod reference;
mod retry;

pub use config::{
    inputs, parse_targets, ActionConfig, ActionKind, ConfigError, MoveTarget, RunSettings,
};
pub use reference::{
    parse_references, ParseOutcome, ReferenceParser, ReferenceWarning, TaskReference,
    TriggerPhrase,
};
pub use retry::{retry_async, RetryConfig, RetryResult, Retryable};
