use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::types::{ClassifiedToken, ImportOutcome, OutcomeStatus};

/// Events emitted by the batch submitter.
#[derive(Debug, Clone)]
pub enum SubmissionEvent {
    RunStarted { total: usize },
    Dispatched { token: ClassifiedToken, dispatched: usize, total: usize },
    Settled { outcome: ImportOutcome },
    RunCancelled { settled: usize, total: usize },
    RunFinished {
        elapsed: Duration,
        metrics: SubmissionMetricsSnapshot,
    },
}

/// Observer hook for submission events.
pub trait SubmissionObserver: Send + Sync {
    fn on_event(&self, event: &SubmissionEvent);
}

/// Logs submission events through `tracing`.
#[derive(Default)]
pub struct TracingSubmissionObserver;

impl SubmissionObserver for TracingSubmissionObserver {
    fn on_event(&self, event: &SubmissionEvent) {
        match event {
            SubmissionEvent::Settled { outcome } => match &outcome.status {
                OutcomeStatus::Failed(reason) => {
                    tracing::warn!(token = %outcome.token.value, %reason, "resolution failed")
                }
                status => tracing::trace!(token = %outcome.token.value, ?status, "resolution settled"),
            },
            SubmissionEvent::RunFinished { metrics, .. } => tracing::info!(%metrics, "submission finished"),
            SubmissionEvent::RunCancelled { settled, total } => {
                tracing::info!(settled, total, "submission cancelled")
            }
            other => tracing::trace!(event = ?other, "submission event"),
        }
    }
}

/// Real-time metrics for a submission run.
///
/// The submitter updates these counters while a batch is in flight; callers can snapshot them
/// at any time.
pub struct SubmissionMetrics {
    run_id: AtomicU64,
    started_at: Mutex<Option<Instant>>,
    elapsed_ns: AtomicU64,

    dispatched: AtomicU64,
    settled: AtomicU64,
    resolved: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,

    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SubmissionMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            started_at: Mutex::new(None),
            elapsed_ns: AtomicU64::new(0),
            dispatched: AtomicU64::new(0),
            settled: AtomicU64::new(0),
            resolved: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn begin_run(&self) {
        let _ = self.run_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut started) = self.started_at.lock() {
            *started = Some(Instant::now());
        }

        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.dispatched.store(0, Ordering::SeqCst);
        self.settled.store(0, Ordering::SeqCst);
        self.resolved.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
        self.skipped.store(0, Ordering::SeqCst);
        self.in_flight.store(0, Ordering::SeqCst);
        self.max_in_flight.store(0, Ordering::SeqCst);
    }

    pub fn end_run(&self) {
        let elapsed = self
            .started_at
            .lock()
            .ok()
            .and_then(|started| *started)
            .map(|t| t.elapsed())
            .unwrap_or_default();
        self.elapsed_ns
            .store(elapsed.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
        self.in_flight.store(0, Ordering::SeqCst);
    }

    pub fn on_dispatch(&self) {
        let _ = self.dispatched.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    pub fn on_settle(&self, status: &OutcomeStatus) {
        let _ = self.settled.fetch_add(1, Ordering::SeqCst);
        let _ = self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let counter = match status {
            OutcomeStatus::Resolved => &self.resolved,
            OutcomeStatus::Failed(_) => &self.failed,
            OutcomeStatus::Skipped => &self.skipped,
        };
        let _ = counter.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> SubmissionMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        let elapsed = if elapsed_ns > 0 {
            Some(Duration::from_nanos(elapsed_ns))
        } else {
            None
        };

        SubmissionMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed,
            dispatched: self.dispatched.load(Ordering::SeqCst),
            settled: self.settled.load(Ordering::SeqCst),
            resolved: self.resolved.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            max_in_flight: self.max_in_flight.load(Ordering::SeqCst),
        }
    }
}

impl Default for SubmissionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable snapshot of [`SubmissionMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub dispatched: u64,
    pub settled: u64,
    pub resolved: u64,
    pub failed: u64,
    pub skipped: u64,
    pub max_in_flight: usize,
}

impl fmt::Display for SubmissionMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, settled={}/{}, resolved={}, failed={}, skipped={}, max_in_flight={}, elapsed={:?}",
            self.run_id,
            self.settled,
            self.dispatched,
            self.resolved,
            self.failed,
            self.skipped,
            self.max_in_flight,
            self.elapsed
        )
    }
}
