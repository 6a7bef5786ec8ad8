//! Observer hooks for analysis results and session transitions.
//!
//! The analysis entrypoints report every attempt to an optional [`IngestionObserver`]:
//! `on_success` with [`IngestionStats`], or `on_failure` with an [`IngestionSeverity`]
//! and, at or above [`super::IngestionOptions::alert_at_or_above`], `on_alert` as well.
//! [`crate::session::IngestionSession`] additionally reports each state change to `on_state`.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::IngestionError;
use crate::session::IngestionState;

use super::unified::ImportMode;

/// How bad a failed analysis is; ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IngestionSeverity {
    /// Nothing failed, but the caller may want to know (e.g. an empty batch).
    Info,
    /// A call was rejected or abandoned; the next cycle is unaffected.
    Warning,
    /// The input was read but its shape could not be used.
    Error,
    /// The input could not be read at all.
    Critical,
}

impl fmt::Display for IngestionSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Which source an event is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionContext {
    /// Display name of the acquired source.
    pub source: String,
    /// Mode the source was analyzed with.
    pub mode: ImportMode,
}

/// Counts reported on successful analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestionStats {
    /// Tokens extracted before classification.
    pub tokens: usize,
    /// Tokens in the final batch.
    pub batch: usize,
    /// Tokens that matched no classification rule.
    pub misses: usize,
    /// Recognized tokens dropped as duplicates.
    pub duplicates: usize,
    /// Row-mode rows whose cell was not a long-form reference.
    pub rejected_rows: usize,
}

/// Receives analysis outcomes and session transitions.
///
/// All methods default to doing nothing, except `on_alert`, which forwards to `on_failure`.
pub trait IngestionObserver: Send + Sync {
    fn on_state(&self, _state: &IngestionState) {}

    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Forwards every callback to each wrapped observer, in insertion order.
#[derive(Default, Clone)]
pub struct CompositeObserver {
    inner: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { inner: observers }
    }

    /// Add another observer to the end of the fan-out list.
    pub fn push(mut self, observer: Arc<dyn IngestionObserver>) -> Self {
        self.inner.push(observer);
        self
    }

    fn each(&self, f: impl Fn(&dyn IngestionObserver)) {
        self.inner.iter().for_each(|o| f(o.as_ref()));
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompositeObserver({} observers)", self.inner.len())
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_state(&self, state: &IngestionState) {
        self.each(|o| o.on_state(state));
    }

    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.each(|o| o.on_success(ctx, stats));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.each(|o| o.on_failure(ctx, severity, error));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.each(|o| o.on_alert(ctx, severity, error));
    }
}

/// Emits ingestion events as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_state(&self, state: &IngestionState) {
        match state {
            IngestionState::Submitting { progress, total } => {
                debug!(state = state.name(), progress, total, "ingestion state changed")
            }
            _ => debug!(state = state.name(), "ingestion state changed"),
        }
    }

    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        info!(
            source = %ctx.source,
            mode = ?ctx.mode,
            tokens = stats.tokens,
            batch = stats.batch,
            misses = stats.misses,
            duplicates = stats.duplicates,
            rejected_rows = stats.rejected_rows,
            "analysis complete"
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, err: &IngestionError) {
        warn!(source = %ctx.source, mode = ?ctx.mode, %severity, error = %err, "analysis failed");
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, err: &IngestionError) {
        error!(source = %ctx.source, mode = ?ctx.mode, %severity, error = %err, "analysis alert");
    }
}

/// Appends one line per event to a log file.
///
/// The file is opened on the first event. Open and write errors are dropped so a broken
/// log never fails an ingestion cycle.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileObserver {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: Mutex::new(None),
        }
    }

    /// Where events are written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_event(&self, tag: &str, detail: fmt::Arguments<'_>) {
        let Ok(mut slot) = self.file.lock() else {
            return;
        };
        if slot.is_none() {
            *slot = OpenOptions::new().create(true).append(true).open(&self.path).ok();
        }
        if let Some(file) = slot.as_mut() {
            let _ = writeln!(file, "{} {tag} {detail}", unix_ts());
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_state(&self, state: &IngestionState) {
        self.write_event("state", format_args!("{}", state.name()));
    }

    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.write_event(
            "ok",
            format_args!(
                "mode={:?} source={} tokens={} batch={} misses={} duplicates={} rejected_rows={}",
                ctx.mode, ctx.source, stats.tokens, stats.batch, stats.misses, stats.duplicates, stats.rejected_rows
            ),
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, err: &IngestionError) {
        self.write_event(
            "fail",
            format_args!("severity={severity} mode={:?} source={} err={err}", ctx.mode, ctx.source),
        );
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, err: &IngestionError) {
        self.write_event(
            "ALERT",
            format_args!("severity={severity} mode={:?} source={} err={err}", ctx.mode, ctx.source),
        );
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
