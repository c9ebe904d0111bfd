//! tasklink - link GitHub pull requests to Asana tasks.
//!
//! Runs one action per invocation from inside a GitHub Actions job, or
//! parses a pull request body locally to check which tasks it references.

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tasklink::{run_and_report, ActionsHost, LiveBackends, ReferenceParser, TriggerPhrase};

/// Link GitHub pull requests to Asana tasks
#[derive(Parser)]
#[command(name = "tasklink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured action from the CI environment (default)
    Run {
        /// Input override (key=value), repeatable
        #[arg(short, long = "input", value_name = "KEY=VALUE")]
        input: Vec<String>,

        /// Event payload to read the pull request from
        #[arg(long, value_name = "FILE")]
        event_path: Option<PathBuf>,

        /// Log task mutations instead of performing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the task references found in a pull request body
    Parse {
        /// File holding the body (defaults to stdin)
        file: Option<PathBuf>,

        /// Text preceding task URLs
        #[arg(short, long, default_value = "")]
        trigger_phrase: String,

        /// Treat the trigger phrase as a regular expression
        #[arg(long)]
        regex: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("TASKLINK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    match cli.command {
        None => cmd_run(Vec::new(), None, false),
        Some(Commands::Run { input, event_path, dry_run }) => cmd_run(input, event_path, dry_run),
        Some(Commands::Parse { file, trigger_phrase, regex }) => {
            cmd_parse(file, trigger_phrase, regex)
        }
        Some(Commands::Completions { shell }) => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

/// Split a `key=value` override.
fn parse_input(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("invalid input override '{raw}', expected key=value"))?;
    Ok((key.trim().to_string(), value.to_string()))
}

/// Run one action.
fn cmd_run(inputs: Vec<String>, event_path: Option<PathBuf>, dry_run: bool) -> Result<()> {
    dotenvy::dotenv().ok();

    let mut host = ActionsHost::from_env()?;
    for raw in &inputs {
        let (key, value) = parse_input(raw)?;
        host = host.with_input(key, value);
    }
    if let Some(path) = event_path {
        host = host.with_event_path(&path)?;
    }

    let backends =
        LiveBackends::new(dry_run).with_github_api_url(std::env::var("GITHUB_API_URL").ok());

    // Create tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_and_report(&host, &backends));

    if host.failed() {
        std::process::exit(1);
    }
    Ok(())
}

/// Print references found in a body as JSON.
fn cmd_parse(file: Option<PathBuf>, trigger_phrase: String, regex: bool) -> Result<()> {
    let body = match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut body = String::new();
            io::stdin().read_to_string(&mut body)?;
            body
        }
    };

    let trigger = if regex {
        TriggerPhrase::pattern(trigger_phrase)
    } else {
        TriggerPhrase::literal(trigger_phrase)
    };
    let parser = ReferenceParser::new(trigger).context("invalid trigger phrase pattern")?;
    let outcome = parser.parse(&body);

    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }
    println!("{}", serde_json::to_string_pretty(&outcome.references)?);
    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "tasklink", &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(
            parse_input("comment-id=a=b").unwrap(),
            ("comment-id".to_string(), "a=b".to_string())
        );
        assert!(parse_input("no-equals").is_err());
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }
}
