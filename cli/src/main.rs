//! lintbridge CLI - one-shot lint and fix through the configured worker.
//!
//! ```text
//! lintbridge [--config PATH] lint <FILE>
//! lintbridge [--config PATH] fix <FILE>
//! ```
//!
//! `lint` prints one `path:line:col: severity: message [rule]` line per
//! diagnostic and exits with status 1 when any of them is an error. `fix`
//! asks the worker to fix the file in place and prints its summary.
//!
//! Logs go to stderr, filtered by `RUST_LOG` (default `warn`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use lintbridge_engine::{
    Bridge, BridgeConfig, Diagnostic, Document, LintOutcome, Notifier, ProcessLauncher, TextBuffer,
};

/// Exit status when nothing at error severity was found.
const STATUS_CLEAN: u8 = 0;
/// Exit status when at least one diagnostic is an error.
const STATUS_LINT_ERRORS: u8 = 1;
/// Exit status for anything that kept the command from completing.
const STATUS_FAILED: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "lintbridge")]
#[command(about = "Lint or fix a file through the configured ESLint worker")]
struct Cli {
    /// Config file (defaults to $LINTBRIDGE_CONFIG, then ~/.lintbridge/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
enum Command {
    /// Print diagnostics for a file (exit 1 if any is an error)
    Lint {
        /// File to lint
        file: PathBuf,
    },
    /// Fix a file in place and print the worker's summary
    Fix {
        /// File to fix
        file: PathBuf,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_default();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

/// Prints notifications to stderr, where they do not mix with results.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn success(&self, message: &str) {
        tracing::debug!("{message}");
    }

    fn warning(&self, message: &str) {
        eprintln!("warning: {message}");
    }

    fn error(&self, title: &str, detail: &str) {
        if detail.is_empty() {
            eprintln!("error: {title}");
        } else {
            eprintln!("error: {title}: {detail}");
        }
    }
}

fn format_diagnostic(path: &Path, diagnostic: &Diagnostic) -> String {
    let start = diagnostic.range().start;
    let mut line = format!(
        "{}:{start}: {}: {}",
        path.display(),
        diagnostic.severity().label(),
        diagnostic.message().as_str()
    );
    if let Some(rule) = diagnostic.rule_id() {
        line.push_str(&format!(" [{rule}]"));
    }
    line
}

fn exit_status(diagnostics: &[Diagnostic]) -> u8 {
    if diagnostics.iter().any(|d| d.severity().is_error()) {
        STATUS_LINT_ERRORS
    } else {
        STATUS_CLEAN
    }
}

async fn lint(bridge: &Bridge, path: &Path) -> Result<u8> {
    let buffer = TextBuffer::open(path).with_context(|| format!("reading {}", path.display()))?;
    let diagnostics = match bridge.lint(&buffer).await? {
        LintOutcome::Updated(diagnostics) => diagnostics,
        LintOutcome::Stale => Vec::new(),
    };

    let mut stdout = io::stdout().lock();
    for diagnostic in &diagnostics {
        writeln!(stdout, "{}", format_diagnostic(path, diagnostic))?;
    }
    Ok(exit_status(&diagnostics))
}

async fn fix(bridge: &Bridge, path: &Path) -> Result<u8> {
    let buffer = TextBuffer::open(path).with_context(|| format!("reading {}", path.display()))?;
    let summary = bridge.fix_file(Some(&buffer as &dyn Document)).await?;
    println!("{summary}");
    Ok(STATUS_CLEAN)
}

async fn run(cli: Cli) -> Result<u8> {
    let mut config = match cli.config {
        Some(path) => BridgeConfig::load_from(path)?,
        None => BridgeConfig::load()?.unwrap_or_default(),
    };
    // Terminal output has no use for badge markup.
    config.linter.show_rule_id_in_message = false;

    let launcher = Arc::new(ProcessLauncher::new(config.worker.clone()));
    let bridge = Bridge::activate(
        config.linter,
        &config.worker,
        launcher,
        Arc::new(StderrNotifier),
    );

    let result = match &cli.command {
        Command::Lint { file } => lint(&bridge, file).await,
        Command::Fix { file } => fix(&bridge, file).await,
    };

    bridge.deactivate().await;
    result
}

/// Report a failed run and turn the outcome into an exit status.
fn finish(result: Result<u8>) -> u8 {
    match result {
        Ok(status) => status,
        Err(err) => {
            eprintln!("Error: {err:#}");
            STATUS_FAILED
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();
    ExitCode::from(finish(run(cli).await))
}
