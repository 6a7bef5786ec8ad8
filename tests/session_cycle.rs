use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use refbatch::IngestionError;
use refbatch::execution::{DryRunResolver, Resolution, ResolveError, Resolver, SubmitOptions};
use refbatch::ingestion::{ImportMode, IngestionObserver, IngestionOptions, RawSource};
use refbatch::session::{IngestionSession, IngestionState};
use refbatch::types::{ClassifiedToken, OutcomeStatus, TokenKind};

#[derive(Default)]
struct StateRecorder {
    names: Mutex<Vec<&'static str>>,
    progress: Mutex<Vec<f32>>,
}

impl IngestionObserver for StateRecorder {
    fn on_state(&self, state: &IngestionState) {
        self.names.lock().unwrap().push(state.name());
        if let IngestionState::Submitting { progress, .. } = state {
            self.progress.lock().unwrap().push(*progress);
        }
    }
}

fn options_with(recorder: Arc<StateRecorder>) -> IngestionOptions {
    IngestionOptions {
        observer: Some(recorder),
        ..Default::default()
    }
}

/// Fails every video id, skips watch-later, resolves everything else.
struct PickyResolver;

#[async_trait]
impl Resolver for PickyResolver {
    async fn resolve(&self, token: &ClassifiedToken) -> Result<Resolution, ResolveError> {
        tokio::task::yield_now().await;
        match token.kind {
            TokenKind::VideoId => Err(ResolveError::NotFound(token.value.to_string())),
            TokenKind::PlaylistId if token.value.as_str() == "WL" => Ok(Resolution::Skipped),
            _ => Ok(Resolution::Resolved),
        }
    }
}

struct NeverResolver;

#[async_trait]
impl Resolver for NeverResolver {
    async fn resolve(&self, _token: &ClassifiedToken) -> Result<Resolution, ResolveError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn full_cycle_reports_every_transition() {
    let recorder = Arc::new(StateRecorder::default());
    let mut session = IngestionSession::new(
        Arc::new(DryRunResolver),
        options_with(recorder.clone()),
        SubmitOptions::default(),
    );

    let state = session.acquire(RawSource::text("PLxyz123, dQw4w9WgXcQ; not-a-token"));
    assert!(state.can_submit());

    let summary = session.confirm_submit().await.unwrap();
    assert_eq!(summary.resolved, 2);
    assert_eq!(session.state(), &IngestionState::Completed(summary));

    let names = recorder.names.lock().unwrap().clone();
    assert_eq!(&names[..4], &["acquired", "analyzing", "ready", "submitting"]);
    assert_eq!(names.last(), Some(&"completed"));
    assert!(names[4..names.len() - 1].iter().all(|n| *n == "submitting"));

    let progress = recorder.progress.lock().unwrap().clone();
    assert_eq!(progress.first().copied(), Some(0.0));
    assert_eq!(progress.last().copied(), Some(1.0));
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn partial_failures_still_complete() {
    let mut session = IngestionSession::new(
        Arc::new(PickyResolver),
        IngestionOptions::default(),
        SubmitOptions::default(),
    );

    session.acquire(RawSource::file("mixed.txt", b"PLabc,dQw4w9WgXcQ,WL\nhttps://youtube.com/@alpha".to_vec()));
    let summary = session.confirm_submit().await.unwrap();

    assert_eq!(summary.total(), 4);
    assert_eq!((summary.resolved, summary.failed, summary.skipped), (2, 1, 1));
    let failed: Vec<_> = summary
        .outcomes
        .iter()
        .filter(|o| matches!(o.status, OutcomeStatus::Failed(_)))
        .map(|o| o.token.value.to_string())
        .collect();
    assert_eq!(failed, vec!["dQw4w9WgXcQ"]);
}

#[tokio::test]
async fn structural_failure_ends_the_cycle() {
    let recorder = Arc::new(StateRecorder::default());
    let mut session = IngestionSession::new(
        Arc::new(DryRunResolver),
        IngestionOptions {
            mode: Some(ImportMode::ReferenceTable),
            ..options_with(recorder.clone())
        },
        SubmitOptions::default(),
    );

    let state = session.acquire(RawSource::text("Channel URL"));
    assert!(matches!(state, IngestionState::StructuralFailure { .. }));
    assert!(state.is_terminal());

    let err = session.confirm_submit().await.unwrap_err();
    assert!(matches!(err, IngestionError::InvalidTransition { .. }));

    // A new acquisition recovers.
    session.acquire(RawSource::text("Channel URL\nhttps://youtube.com/@alpha"));
    assert!(session.state().can_submit());

    let names = recorder.names.lock().unwrap().clone();
    assert_eq!(
        names,
        vec!["acquired", "analyzing", "structural failure", "idle", "acquired", "analyzing", "ready"]
    );
}

#[tokio::test]
async fn cancel_handle_abandons_in_flight_submission() {
    let recorder = Arc::new(StateRecorder::default());
    let mut session = IngestionSession::new(
        Arc::new(NeverResolver),
        options_with(recorder.clone()),
        SubmitOptions {
            max_in_flight: 2,
            item_timeout: None,
        },
    );
    session.acquire(RawSource::text("PLa, PLb, PLc"));
    let cycle_before = session.cycle_id();

    let handle = session.cancel_handle();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();
    });

    let err = session.confirm_submit().await.unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, IngestionError::Cancelled));
    assert_eq!(session.state(), &IngestionState::Idle);
    assert_eq!(recorder.names.lock().unwrap().last(), Some(&"idle"));
    assert_eq!(session.submitter().metrics().snapshot().settled, 0);

    // The next cycle proceeds normally.
    session.acquire(RawSource::text("PLd"));
    assert!(session.cycle_id() > cycle_before);
    assert!(session.state().can_submit());
}

#[tokio::test]
async fn cancel_handle_while_ready_skips_submission() {
    let recorder = Arc::new(StateRecorder::default());
    let mut session = IngestionSession::new(
        Arc::new(DryRunResolver),
        options_with(recorder.clone()),
        SubmitOptions::default(),
    );
    session.acquire(RawSource::text("PLabc"));
    assert!(session.can_submit());

    session.cancel_handle().cancel();
    assert!(!session.can_submit());

    let err = session.confirm_submit().await.unwrap_err();
    assert!(matches!(err, IngestionError::Cancelled));
    assert_eq!(session.state(), &IngestionState::Idle);

    let names = recorder.names.lock().unwrap().clone();
    assert_eq!(names, vec!["acquired", "analyzing", "ready", "idle"]);
    assert!(!names.contains(&"submitting"));
    assert_eq!(session.submitter().metrics().snapshot().dispatched, 0);
}

#[tokio::test]
async fn reacquire_replaces_ready_batch() {
    let mut session = IngestionSession::new(
        Arc::new(DryRunResolver),
        IngestionOptions::default(),
        SubmitOptions::default(),
    );

    session.acquire(RawSource::text("PLa, PLb"));
    session.acquire(RawSource::text("PLc"));

    let IngestionState::Ready(report) = session.state() else {
        panic!("expected ready, got {}", session.state().name());
    };
    assert_eq!(report.batch.len(), 1);
    assert!(report.batch.contains("PLc"));
}
