//! CLI entry point for the TfL status bot.
//!
//! Each `run` performs one fetch, diff, persist and notify cycle and exits;
//! repeat invocations are left to cron or a systemd timer.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tfl_status_bot::{
    config::Config,
    cycle::{preview_cycle, run_cycle},
    fetch::BasicClient,
    infra::{tfl::TflClient, threads::ThreadsClient},
    notify::{DryRunPublisher, Notifier},
    output::write_history,
    services::post_api::PostPublisher,
    store::{StatusRecord, StatusStore},
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "tfl_status_bot")]
#[command(about = "Posts TfL line status changes to Threads", long_about = None)]
struct Cli {
    /// Override the SQLite database path (defaults to STATUS_DB_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch current statuses, record changes and post about them
    Run {
        /// Log the posts instead of sending them
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Show the last recorded status of every line
    Latest,
    /// Show recorded status changes, oldest first
    History {
        /// Only show this line
        #[arg(short, long)]
        line: Option<String>,

        /// Only show the most recent N records
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Export the full status history to CSV
    Export {
        /// CSV file to write
        #[arg(short, long, default_value = "line_status.csv")]
        output: PathBuf,
    },
}

/// Colored stderr plus a JSON daily-rolling log file. The returned guard must
/// live until exit so buffered file output is flushed.
fn init_tracing() -> Result<WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/tfl_status.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("tfl_status.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let cli = Cli::parse();
    let _log_guard = init_tracing()?;

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    let store = StatusStore::new(config.db_path.clone());

    match cli.command {
        Commands::Run { dry_run } => {
            if dry_run {
                run(&config, &store, DryRunPublisher, true).await?;
            } else {
                let threads = config.require_threads()?.clone();
                let publisher = ThreadsClient::new(BasicClient::new()?, threads)?;
                run(&config, &store, publisher, false).await?;
            }
        }
        Commands::Latest => {
            for record in store.latest_all()? {
                log_record(&record);
            }
        }
        Commands::History { line, limit } => {
            let records = store.history(line.as_deref(), limit)?;
            info!(count = records.len(), "Status history");
            for record in &records {
                log_record(record);
            }
        }
        Commands::Export { output } => {
            let records = store.history(None, None)?;
            write_history(&output, &records)
                .with_context(|| format!("Failed to export history to {}", output.display()))?;
        }
    }

    Ok(())
}

#[tracing::instrument(skip_all, fields(db = %store.path().display()))]
async fn run<P: PostPublisher>(
    config: &Config,
    store: &StatusStore,
    publisher: P,
    dry_run: bool,
) -> Result<()> {
    let version = store
        .initialize()
        .context("Failed to open status database")?;
    info!(schema_version = version, "Status store ready");

    let source = TflClient::new(BasicClient::new()?, config.tfl_base_url.clone());
    let notifier = Notifier::new(publisher);

    // A dry run must not record anything, or the next live run would see no changes.
    let summary = if dry_run {
        preview_cycle(&source, &config.modes, store, &notifier).await?
    } else {
        run_cycle(&source, &config.modes, store, &notifier).await?
    };

    if summary.report.failed() > 0 {
        warn!(failed = summary.report.failed(), "Some posts were not published");
    }

    info!(
        fetched = summary.fetched,
        changed = summary.changes.len(),
        published = summary.report.published(),
        "Cycle complete"
    );
    Ok(())
}

fn log_record(record: &StatusRecord) {
    info!(
        id = record.id,
        line = %record.line_name,
        status = %record.status,
        details = %record.status_details,
        timestamp = %record.timestamp,
        post_id = record.external_post_id.as_deref().unwrap_or(""),
        "Line status"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_dry_run() {
        let cli = Cli::try_parse_from(["tfl_status_bot", "run", "--dry-run"]).unwrap();
        assert!(matches!(cli.command, Commands::Run { dry_run: true }));
        assert!(cli.db.is_none());
    }

    #[test]
    fn test_help_is_handled_by_the_parser() {
        let err = Cli::try_parse_from(["tfl_status_bot", "--help"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_parse_history_with_global_db() {
        let cli = Cli::try_parse_from([
            "tfl_status_bot",
            "history",
            "--line",
            "Central",
            "-n",
            "5",
            "--db",
            "/tmp/status.db",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/status.db")));
        match cli.command {
            Commands::History { line, limit } => {
                assert_eq!(line.as_deref(), Some("Central"));
                assert_eq!(limit, Some(5));
            }
            _ => panic!("expected history"),
        }
    }
}
