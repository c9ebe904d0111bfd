//! External integrations module.
//!
//! Concrete clients for the services the bot talks to: Asana for tasks and
//! GitHub for commit statuses.

pub mod asana;
pub mod github_status;

pub use asana::{AsanaClient, AsanaUser};
pub use github_status::GitHubStatuses;
