//! Ingestion state machine.
//!
//! An [`IngestionSession`] runs one ingestion cycle at a time:
//!
//! ```text
//! Idle → Acquired → Analyzing → Ready(report) → Submitting(progress) → Completed(summary)
//!                            ↘ StructuralFailure(message)
//! ```
//!
//! [`IngestionSession::acquire`] runs acquisition and analysis synchronously and stops in
//! `Ready` or `StructuralFailure`. [`IngestionSession::confirm_submit`] hands the batch to the
//! [`BatchSubmitter`] and ends in `Completed`. A new acquisition always starts a fresh cycle
//! from `Idle`; [`IngestionSession::cancel`] (or a [`CancelHandle`] from another task)
//! abandons the current one and discards any outcomes still in flight.
//!
//! Every transition, including each progress update while submitting, is reported to
//! [`crate::ingestion::IngestionObserver::on_state`].

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{IngestionError, IngestionResult};
use crate::execution::{BatchSubmitter, CycleClock, CycleToken, Resolver, SubmissionObserver, SubmitOptions};
use crate::ingestion::{AnalysisReport, IngestionObserver, IngestionOptions, RawSource, analyze_source};
use crate::types::ImportSummary;

/// Observable state of an ingestion cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestionState {
    /// No source acquired.
    Idle,
    /// A source was captured and is about to be analyzed.
    Acquired { source: String },
    /// Detection, tokenization, classification and deduplication are running.
    Analyzing { source: String },
    /// Analysis finished. Submission is possible only if the batch is non-empty.
    Ready(AnalysisReport),
    /// The batch is being resolved; `progress` is the dispatched fraction.
    Submitting { progress: f32, total: usize },
    /// Every item settled.
    Completed(ImportSummary),
    /// The source could not be read or its shape could not be determined.
    StructuralFailure { message: String },
}

impl IngestionState {
    /// Short lower-case name, used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Acquired { .. } => "acquired",
            Self::Analyzing { .. } => "analyzing",
            Self::Ready(_) => "ready",
            Self::Submitting { .. } => "submitting",
            Self::Completed(_) => "completed",
            Self::StructuralFailure { .. } => "structural failure",
        }
    }

    /// Whether the cycle has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::StructuralFailure { .. })
    }

    /// Whether the state allows a submission. The session-level
    /// [`IngestionSession::can_submit`] also checks that the cycle was not cancelled.
    pub fn can_submit(&self) -> bool {
        matches!(self, Self::Ready(report) if !report.batch.is_empty())
    }
}

/// Cancels the cycle that was current when the handle was last used, from any task.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    clock: CycleClock,
}

impl CancelHandle {
    /// Supersede the current cycle. An in-flight submission stops and reports
    /// [`IngestionError::Cancelled`].
    pub fn cancel(&self) {
        let _ = self.clock.advance();
    }
}

/// Coordinates acquisition, analysis and submission for one consumer.
pub struct IngestionSession<R: ?Sized> {
    options: IngestionOptions,
    submitter: BatchSubmitter<R>,
    clock: CycleClock,
    cycle: CycleToken,
    state: IngestionState,
}

impl<R> IngestionSession<R>
where
    R: Resolver + ?Sized + 'static,
{
    pub fn new(resolver: Arc<R>, options: IngestionOptions, submit: SubmitOptions) -> Self {
        let clock = CycleClock::new();
        let cycle = clock.current();
        Self {
            options,
            submitter: BatchSubmitter::new(resolver, submit),
            clock,
            cycle,
            state: IngestionState::Idle,
        }
    }

    /// Attach an observer for per-item submission events.
    pub fn with_submission_observer(mut self, observer: Arc<dyn SubmissionObserver>) -> Self {
        self.submitter = self.submitter.with_observer(observer);
        self
    }

    pub fn state(&self) -> &IngestionState {
        &self.state
    }

    /// Identifier of the current cycle.
    pub fn cycle_id(&self) -> u64 {
        self.cycle.id()
    }

    /// The submitter used by [`Self::confirm_submit`].
    pub fn submitter(&self) -> &BatchSubmitter<R> {
        &self.submitter
    }

    /// A handle that can cancel the running cycle while `confirm_submit` is awaited.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            clock: self.clock.clone(),
        }
    }

    /// Start a fresh cycle with `source` and analyze it.
    ///
    /// Ends in [`IngestionState::Ready`] or [`IngestionState::StructuralFailure`].
    pub fn acquire(&mut self, source: RawSource) -> &IngestionState {
        self.cycle = self.clock.advance();
        if self.state != IngestionState::Idle {
            self.transition(IngestionState::Idle);
        }

        let name = source.display_name().to_owned();
        self.transition(IngestionState::Acquired { source: name.clone() });
        self.transition(IngestionState::Analyzing { source: name });

        let next = match analyze_source(source, &self.options) {
            Ok(report) => IngestionState::Ready(report),
            Err(e) => IngestionState::StructuralFailure {
                message: e.to_string(),
            },
        };
        self.transition(next);
        &self.state
    }

    /// Whether [`Self::confirm_submit`] would start a submission: the state is `Ready` with a
    /// non-empty batch and the cycle has not been cancelled through a [`CancelHandle`].
    pub fn can_submit(&self) -> bool {
        self.cycle.is_current() && self.state.can_submit()
    }

    /// Submit the ready batch and wait for every item to settle.
    ///
    /// Fails without changing state if the session is not `Ready` or the batch is empty.
    /// If the cycle was cancelled before or during submission, the session returns to `Idle`
    /// and [`IngestionError::Cancelled`] is returned.
    pub async fn confirm_submit(&mut self) -> IngestionResult<ImportSummary> {
        if matches!(self.state, IngestionState::Ready(_)) && !self.cycle.is_current() {
            debug!(cycle = self.cycle.id(), "ready batch belongs to a cancelled cycle");
            self.transition(IngestionState::Idle);
            return Err(IngestionError::Cancelled);
        }

        let report = match std::mem::replace(&mut self.state, IngestionState::Idle) {
            IngestionState::Ready(report) if !report.batch.is_empty() => report,
            other => {
                let err = match &other {
                    IngestionState::Ready(_) => IngestionError::EmptyBatch,
                    state => IngestionError::InvalidTransition {
                        action: "confirm submit",
                        state: state.name(),
                    },
                };
                self.state = other;
                return Err(err);
            }
        };

        let total = report.batch.len();
        self.transition(IngestionState::Submitting { progress: 0.0, total });

        let observer = self.options.observer.clone();
        let result = self
            .submitter
            .run(report.batch, &self.cycle, move |progress| {
                if let Some(obs) = &observer {
                    obs.on_state(&IngestionState::Submitting { progress, total });
                }
            })
            .await;

        match result {
            Ok(summary) => {
                info!(cycle = self.cycle.id(), %summary, "batch submitted");
                self.transition(IngestionState::Completed(summary.clone()));
                Ok(summary)
            }
            Err(e) => {
                debug!(cycle = self.cycle.id(), error = %e, "submission abandoned");
                self.transition(IngestionState::Idle);
                Err(e)
            }
        }
    }

    /// Abandon the current cycle and return to `Idle`.
    pub fn cancel(&mut self) {
        self.cycle = self.clock.advance();
        if self.state != IngestionState::Idle {
            self.transition(IngestionState::Idle);
        }
    }

    fn transition(&mut self, next: IngestionState) {
        debug!(from = self.state.name(), to = next.name(), cycle = self.cycle.id(), "state transition");
        self.state = next;
        if let Some(obs) = &self.options.observer {
            obs.on_state(&self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::DryRunResolver;

    fn session() -> IngestionSession<DryRunResolver> {
        IngestionSession::new(Arc::new(DryRunResolver), IngestionOptions::default(), SubmitOptions::default())
    }

    #[tokio::test]
    async fn confirm_from_idle_is_rejected() {
        let mut s = session();
        let err = s.confirm_submit().await.unwrap_err();
        assert!(matches!(err, IngestionError::InvalidTransition { state: "idle", .. }));
        assert_eq!(s.state(), &IngestionState::Idle);
    }

    #[tokio::test]
    async fn empty_batch_is_ready_but_not_submittable() {
        let mut s = session();
        let state = s.acquire(RawSource::text("nothing useful here"));
        assert_eq!(state.name(), "ready");
        assert!(!state.can_submit());
        assert!(matches!(s.confirm_submit().await, Err(IngestionError::EmptyBatch)));
        assert_eq!(s.state().name(), "ready");
    }

    #[test]
    fn each_acquire_starts_a_new_cycle() {
        let mut s = session();
        let first = s.cycle_id();
        s.acquire(RawSource::text("PLabc"));
        let second = s.cycle_id();
        s.acquire(RawSource::text("PLdef"));
        assert!(first < second && second < s.cycle_id());
    }

    #[tokio::test]
    async fn invalid_confirm_keeps_structural_failure() {
        let mut s = IngestionSession::new(
            Arc::new(DryRunResolver),
            IngestionOptions {
                mode: Some(crate::ingestion::ImportMode::ReferenceTable),
                ..Default::default()
            },
            SubmitOptions::default(),
        );
        s.acquire(RawSource::text("Channel URL"));
        let err = s.confirm_submit().await.unwrap_err();
        assert!(matches!(err, IngestionError::InvalidTransition { state: "structural failure", .. }));
        assert_eq!(s.state().name(), "structural failure");
    }

    #[test]
    fn cancel_returns_to_idle() {
        let mut s = session();
        s.acquire(RawSource::text("PLabc"));
        s.cancel();
        assert_eq!(s.state(), &IngestionState::Idle);
    }
}
