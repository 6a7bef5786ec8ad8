//! refbatch - analyze reference lists and exports
//!
//! **Usage:**
//! ```bash
//! refbatch [--mode auto|table|scan] [--json] [--submit] [--max-in-flight N] <INPUT>...
//! ```
//!
//! Each INPUT is a path or a glob pattern. Every matched file is analyzed as its own cycle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};

use refbatch::execution::{DryRunResolver, SubmitOptions, TracingSubmissionObserver};
use refbatch::ingestion::{ImportMode, IngestionOptions, RawSource, TracingObserver};
use refbatch::session::{IngestionSession, IngestionState};

/// Bulk reference import analyzer
#[derive(Parser, Debug)]
#[command(name = "refbatch")]
#[command(version)]
#[command(about = "Classify and deduplicate channel/playlist/video references from text or CSV files")]
struct Args {
    /// Files or glob patterns to analyze
    #[arg(required = true, value_name = "INPUT")]
    inputs: Vec<String>,

    /// How to read the input (default: infer from file extension)
    #[arg(long, value_enum, env = "REFBATCH_MODE")]
    mode: Option<ModeArg>,

    /// Print the analysis report as JSON
    #[arg(long)]
    json: bool,

    /// Drive each batch through a resolver that accepts every token
    #[arg(long)]
    submit: bool,

    /// Maximum concurrent resolve calls when submitting
    #[arg(long, default_value = "8", env = "REFBATCH_MAX_IN_FLIGHT")]
    max_in_flight: usize,

    /// Per-item resolve timeout in seconds (0 disables)
    #[arg(long, default_value = "30")]
    item_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Auto,
    Table,
    Scan,
}

impl From<ModeArg> for ImportMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => ImportMode::Auto,
            ModeArg::Table => ImportMode::ReferenceTable,
            ModeArg::Scan => ImportMode::FreeScan,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let paths = expand_inputs(&args.inputs);
    if paths.is_empty() {
        error!("no input files matched");
        std::process::exit(2);
    }

    let options = IngestionOptions {
        mode: args.mode.map(ImportMode::from),
        observer: Some(Arc::new(TracingObserver)),
        ..Default::default()
    };
    let submit = SubmitOptions {
        max_in_flight: args.max_in_flight.max(1),
        item_timeout: (args.item_timeout_secs > 0).then(|| Duration::from_secs(args.item_timeout_secs)),
    };
    let mut session = IngestionSession::new(Arc::new(DryRunResolver), options, submit)
        .with_submission_observer(Arc::new(TracingSubmissionObserver));

    let mut failures = 0usize;
    for path in paths {
        let source = match RawSource::from_path(&path) {
            Ok(source) => source,
            Err(e) => {
                error!(path = %path.display(), error = %e, "cannot read input");
                failures += 1;
                continue;
            }
        };

        match session.acquire(source) {
            IngestionState::Ready(report) => {
                if args.json {
                    match serde_json::to_string_pretty(report) {
                        Ok(json) => println!("{json}"),
                        Err(e) => error!(error = %e, "cannot serialize report"),
                    }
                } else {
                    println!(
                        "{}: {} item(s) ({} rejected, {} duplicate, {} unrecognized)",
                        path.display(),
                        report.batch.len(),
                        report.stats.rejected_rows,
                        report.stats.duplicates,
                        report.stats.misses
                    );
                    for token in report.batch.iter() {
                        println!("  {:?}\t{}", token.kind, token.value);
                    }
                }
            }
            IngestionState::StructuralFailure { message } => {
                eprintln!("{}: {message}", path.display());
                failures += 1;
                continue;
            }
            other => {
                warn!(state = other.name(), "unexpected state after analysis");
                continue;
            }
        }

        if args.submit && session.can_submit() {
            match session.confirm_submit().await {
                Ok(summary) => {
                    info!(path = %path.display(), %summary, "submitted");
                    println!("  submitted: {summary}");
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "submission failed");
                    failures += 1;
                }
            }
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
}

fn expand_inputs(inputs: &[String]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for input in inputs {
        match glob::glob(input) {
            Ok(paths) => {
                let before = out.len();
                out.extend(paths.filter_map(Result::ok));
                if out.len() == before {
                    // Not a pattern, or nothing matched: let the read report the error.
                    out.push(PathBuf::from(input));
                }
            }
            Err(e) => {
                warn!(pattern = %input, error = %e, "invalid glob pattern; using it as a path");
                out.push(PathBuf::from(input));
            }
        }
    }
    out
}
