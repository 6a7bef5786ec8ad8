//! Batch submission against an external [`Resolver`].
//!
//! This module sits "above" [`crate::processing`] and provides:
//!
//! - Bounded-concurrency dispatch of every token in an [`ImportBatch`]
//! - Dispatch-proportional progress reporting
//! - Completion tracking by counting settled outcomes against dispatched items
//! - Cycle gating: outcomes are only applied while the submitter's [`CycleToken`] is current
//! - Real-time metrics + observer hooks for monitoring

mod cycle;
mod observer;

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use thiserror::Error;
use tracing::debug;

use crate::error::{IngestionError, IngestionResult};
use crate::types::{ClassifiedToken, ImportBatch, ImportOutcome, ImportSummary, OutcomeStatus};

pub use cycle::{CycleClock, CycleToken};
pub use observer::{
    SubmissionEvent, SubmissionMetrics, SubmissionMetricsSnapshot, SubmissionObserver, TracingSubmissionObserver,
};

/// Successful resolution result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The token was turned into a domain object.
    Resolved,
    /// The resolver chose not to import the token (e.g. it is already present).
    Skipped,
}

/// Per-item failure reported by a [`Resolver`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Failed(String),
}

/// External collaborator that resolves one classified token.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, token: &ClassifiedToken) -> Result<Resolution, ResolveError>;
}

/// Resolver that accepts every token without doing any work.
#[derive(Debug, Default)]
pub struct DryRunResolver;

#[async_trait]
impl Resolver for DryRunResolver {
    async fn resolve(&self, _token: &ClassifiedToken) -> Result<Resolution, ResolveError> {
        Ok(Resolution::Resolved)
    }
}

/// Configuration for the [`BatchSubmitter`].
#[derive(Debug, Clone)]
pub struct SubmitOptions {
    /// Upper bound on concurrently pending resolve calls.
    pub max_in_flight: usize,
    /// If set, a resolve call that has not settled within this duration becomes a failure.
    pub item_timeout: Option<Duration>,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            max_in_flight: 8,
            item_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Drives an [`ImportBatch`] through a [`Resolver`].
pub struct BatchSubmitter<R: ?Sized> {
    resolver: Arc<R>,
    opts: SubmitOptions,
    observer: Option<Arc<dyn SubmissionObserver>>,
    metrics: Arc<SubmissionMetrics>,
}

impl<R: ?Sized> fmt::Debug for BatchSubmitter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchSubmitter")
            .field("opts", &self.opts)
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

impl<R> BatchSubmitter<R>
where
    R: Resolver + ?Sized + 'static,
{
    /// Create a new submitter. A `max_in_flight` of 0 is treated as 1.
    pub fn new(resolver: Arc<R>, mut opts: SubmitOptions) -> Self {
        if opts.max_in_flight == 0 {
            debug!("max_in_flight of 0 raised to 1");
            opts.max_in_flight = 1;
        }
        Self {
            resolver,
            opts,
            observer: None,
            metrics: Arc::new(SubmissionMetrics::new()),
        }
    }

    /// Attach an observer for submission events.
    pub fn with_observer(mut self, observer: Arc<dyn SubmissionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle to real-time submission metrics.
    pub fn metrics(&self) -> Arc<SubmissionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Resolve every token and stream outcomes as they settle, in no particular order.
    ///
    /// The stream yields exactly one outcome per batch entry. Metrics and observer events are
    /// updated as items are dispatched and settle, but no run start/finish is recorded.
    pub fn submit_batch(&self, batch: ImportBatch) -> BoxStream<'static, ImportOutcome> {
        self.outcome_stream(batch, |_, _| {}).boxed()
    }

    /// Submit a whole batch and wait until every dispatched item has settled.
    ///
    /// `on_progress` receives `dispatched / total` in `[0.0, 1.0]` each time an item is
    /// dispatched; values never decrease and the last one is `1.0`. Per-item failures are
    /// recorded in the summary and never abort the run.
    ///
    /// If `cycle` is superseded before the run finishes, in-flight calls are dropped, nothing
    /// more is recorded and [`IngestionError::Cancelled`] is returned.
    pub async fn run<F>(
        &self,
        batch: ImportBatch,
        cycle: &CycleToken,
        mut on_progress: F,
    ) -> IngestionResult<ImportSummary>
    where
        F: FnMut(f32) + Send,
    {
        let start = Instant::now();
        let total = batch.len();
        self.metrics.begin_run();
        self.emit(SubmissionEvent::RunStarted { total });
        debug!(total, max_in_flight = self.opts.max_in_flight, cycle = cycle.id(), "submission started");

        if total == 0 {
            on_progress(1.0);
        }

        let mut cycle = cycle.clone();
        let outcomes = self.outcome_stream(batch, |dispatched, total| {
            on_progress(dispatched as f32 / total as f32);
        });
        futures::pin_mut!(outcomes);

        let mut summary = ImportSummary::default();
        loop {
            let next = tokio::select! {
                biased;
                _ = cycle.superseded() => None,
                next = outcomes.next() => Some(next),
            };
            match next {
                Some(Some(outcome)) => summary.record(outcome),
                Some(None) => break,
                None => {
                    self.metrics.end_run();
                    self.emit(SubmissionEvent::RunCancelled {
                        settled: summary.total(),
                        total,
                    });
                    return Err(IngestionError::Cancelled);
                }
            }
        }
        debug_assert_eq!(summary.total(), total);

        self.metrics.end_run();
        self.emit(SubmissionEvent::RunFinished {
            elapsed: start.elapsed(),
            metrics: self.metrics.snapshot(),
        });
        Ok(summary)
    }

    fn outcome_stream<F>(
        &self,
        batch: ImportBatch,
        mut on_dispatch: F,
    ) -> impl Stream<Item = ImportOutcome> + Send + use<R, F>
    where
        F: FnMut(usize, usize) + Send,
    {
        let total = batch.len();
        let timeout = self.opts.item_timeout;
        let resolver = Arc::clone(&self.resolver);
        let dispatch_hooks = Hooks::new(self);
        let settle_hooks = Hooks::new(self);
        let mut dispatched = 0usize;

        stream::iter(batch)
            .map(move |token| {
                dispatched += 1;
                dispatch_hooks.metrics.on_dispatch();
                dispatch_hooks.emit(SubmissionEvent::Dispatched {
                    token: token.clone(),
                    dispatched,
                    total,
                });
                on_dispatch(dispatched, total);
                let resolver = Arc::clone(&resolver);
                async move { resolve_one(resolver.as_ref(), token, timeout).await }
            })
            .buffer_unordered(self.opts.max_in_flight)
            .inspect(move |outcome| {
                settle_hooks.metrics.on_settle(&outcome.status);
                settle_hooks.emit(SubmissionEvent::Settled {
                    outcome: outcome.clone(),
                });
            })
    }

    fn emit(&self, event: SubmissionEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

struct Hooks {
    metrics: Arc<SubmissionMetrics>,
    observer: Option<Arc<dyn SubmissionObserver>>,
}

impl Hooks {
    fn new<R: ?Sized>(submitter: &BatchSubmitter<R>) -> Self {
        Self {
            metrics: Arc::clone(&submitter.metrics),
            observer: submitter.observer.clone(),
        }
    }

    fn emit(&self, event: SubmissionEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

async fn resolve_one<R>(resolver: &R, token: ClassifiedToken, timeout: Option<Duration>) -> ImportOutcome
where
    R: Resolver + ?Sized,
{
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, resolver.resolve(&token)).await {
            Ok(result) => result,
            Err(_) => Err(ResolveError::Failed(format!("timed out after {limit:?}"))),
        },
        None => resolver.resolve(&token).await,
    };
    let status = match result {
        Ok(Resolution::Resolved) => OutcomeStatus::Resolved,
        Ok(Resolution::Skipped) => OutcomeStatus::Skipped,
        Err(e) => OutcomeStatus::Failed(e.to_string()),
    };
    ImportOutcome { token, status }
}
