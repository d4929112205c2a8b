//! issuelens - analyze a GitHub issue and browse the code it points at.
//!
//! `analyze` sends the issue to the analysis service and keeps the result;
//! `summary`, `files` and `view` read the kept result back.

mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use issuelens_adapters::client::{AnalysisClient, ClientConfig};
use issuelens_adapters::config::{Config, ConfigError, API_URL_ENV, STATE_FILE_ENV};
use issuelens_adapters::session::{AnalysisSession, SubmitOutcome};
use issuelens_adapters::stash::{AnalysisStash, FileStore, SavedAnalysis, StashError};
use issuelens_core::viewer::FileSelection;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ISSUELENS_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Parser, Debug)]
#[command(
    name = "issuelens",
    about = "Analyze a GitHub issue and browse the code it touches",
    version
)]
struct Args {
    /// Base URL of the analysis service (default: http://localhost:8000)
    #[arg(long, global = true, env = API_URL_ENV)]
    api_url: Option<String>,

    /// File holding the last analysis
    #[arg(long, global = true, env = STATE_FILE_ENV)]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a GitHub issue and keep the result
    Analyze {
        /// e.g. https://github.com/org/repo/issues/1
        issue_url: String,
    },
    /// Show the summary of the last analysis
    Summary,
    /// List the relevant files of the last analysis
    Files,
    /// Show the annotated code sections of one relevant file
    View {
        /// 1-based position from `files`, or the file's path (default: first file)
        file: Option<String>,
    },
    /// Forget the last analysis
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();
    let config = Config::load();
    tracing::debug!(config = %Config::config_location(), "configuration loaded");

    match run(args, &config).await {
        Ok(code) => code,
        Err(err) => {
            tracing::warn!(error = %err, "command failed");
            for line in failure_lines(&err) {
                eprintln!("{}", line);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, config: &Config) -> Result<ExitCode> {
    let state_path = config.state_path(args.state_file.as_deref())?;
    let stash = AnalysisStash::new(FileStore::new(state_path));

    match args.command {
        Command::Analyze { issue_url } => {
            analyze(config, args.api_url.as_deref(), stash, &issue_url).await
        }
        Command::Summary => Ok(with_saved(&stash, |saved| {
            print!("{}", render::summary(&saved.issue));
        })),
        Command::Files => Ok(with_saved(&stash, |saved| {
            print!("{}", render::file_list(&saved.issue.flattened_files));
        })),
        Command::View { file } => Ok(with_saved(&stash, |saved| {
            view(saved, file.as_deref());
        })),
        Command::Clear => {
            stash.clear()?;
            println!("  Cleared the saved analysis.");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// One-line error plus a hint for the setting most likely at fault.
fn failure_lines(err: &anyhow::Error) -> Vec<String> {
    let mut lines = vec![format!("  ! {}", err)];
    if err.downcast_ref::<ConfigError>().is_some() {
        lines.push(format!(
            "  Check --api-url / {} and --state-file / {} (config: {}).",
            API_URL_ENV,
            STATE_FILE_ENV,
            Config::config_location()
        ));
    } else if err.downcast_ref::<StashError>().is_some() {
        lines.push("  Check that the state file is writable, or pass --state-file.".to_string());
    }
    lines
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Submit one issue and print the outcome.
async fn analyze(
    config: &Config,
    api_url: Option<&str>,
    stash: AnalysisStash<FileStore>,
    issue_url: &str,
) -> Result<ExitCode> {
    let client_config = ClientConfig::new(config.api_url(api_url))?
        .with_timeout(config.request_timeout_secs.map(Duration::from_secs));
    let client = AnalysisClient::new(&client_config)?;
    let session = AnalysisSession::new(client, stash);

    eprintln!("  Analyzing {}...", issue_url.trim());
    match session.submit(issue_url).await {
        Ok(SubmitOutcome::Completed { issue, stashed }) => {
            if !stashed {
                eprintln!("  ! The analysis could not be saved; `summary` and `files` will not see it.");
            }
            print!("{}", render::overview(&issue));
            Ok(ExitCode::SUCCESS)
        }
        Ok(SubmitOutcome::Superseded { .. }) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            eprintln!("  ! {}", err.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Run `show` against the saved analysis, or send the user back to `analyze`.
fn with_saved<F>(stash: &AnalysisStash<FileStore>, show: F) -> ExitCode
where
    F: FnOnce(&SavedAnalysis),
{
    match stash.load() {
        Ok(saved) => show(&saved),
        Err(StashError::Missing) => {
            eprintln!("  No analysis yet. Run `issuelens analyze <ISSUE_URL>` first.");
        }
        Err(err) => {
            tracing::warn!(error = %err, "stored analysis unavailable");
            eprintln!("  ! {}", err);
            eprintln!("  Run `issuelens analyze <ISSUE_URL>` to start over.");
        }
    }
    ExitCode::SUCCESS
}

fn view(saved: &SavedAnalysis, file: Option<&str>) {
    let mut selection = FileSelection::new(&saved.issue.flattened_files);
    if let Some(wanted) = file {
        let found = match wanted.parse::<usize>() {
            Ok(position) if position > 0 => selection.select(position - 1),
            _ => selection.select_path(wanted),
        };
        if !found {
            eprintln!("  No relevant file matches {:?}.", wanted);
            eprint!("{}", render::file_list(selection.files()));
            return;
        }
    }
    print!("{}", render::document(&selection.document()));
}
