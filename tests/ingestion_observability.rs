use std::sync::{Arc, Mutex};

use refbatch::ingestion::{
    CompositeObserver, FileObserver, ImportMode, IngestionContext, IngestionObserver, IngestionOptions,
    IngestionSeverity, IngestionStats, analyze_path, analyze_text,
};

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<IngestionStats>>,
    failures: Mutex<Vec<IngestionSeverity>>,
    alerts: Mutex<Vec<IngestionSeverity>>,
    modes: Mutex<Vec<ImportMode>>,
}

impl IngestionObserver for RecordingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.modes.lock().unwrap().push(ctx.mode);
        self.successes.lock().unwrap().push(stats);
    }

    fn on_failure(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &refbatch::IngestionError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &refbatch::IngestionError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

fn opts_with(obs: Arc<RecordingObserver>) -> IngestionOptions {
    IngestionOptions {
        observer: Some(obs),
        alert_at_or_above: IngestionSeverity::Critical,
        ..Default::default()
    }
}

#[test]
fn observer_receives_failure_and_alert_on_critical_io_error() {
    let obs = Arc::new(RecordingObserver::default());

    // Missing file -> Io error -> Critical
    let _ = analyze_path("tests/fixtures/does_not_exist.csv", &opts_with(obs.clone())).unwrap_err();

    assert_eq!(*obs.failures.lock().unwrap(), vec![IngestionSeverity::Critical]);
    assert_eq!(*obs.alerts.lock().unwrap(), vec![IngestionSeverity::Critical]);
}

#[test]
fn observer_receives_failure_without_alert_for_structural_error() {
    let obs = Arc::new(RecordingObserver::default());

    let _ = analyze_path("tests/fixtures/header_only.csv", &opts_with(obs.clone())).unwrap_err();

    assert_eq!(*obs.failures.lock().unwrap(), vec![IngestionSeverity::Error]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn lower_threshold_alerts_on_structural_error() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = IngestionOptions {
        alert_at_or_above: IngestionSeverity::Error,
        ..opts_with(obs.clone())
    };

    let _ = analyze_path("tests/fixtures/header_only.csv", &opts).unwrap_err();

    assert_eq!(*obs.alerts.lock().unwrap(), vec![IngestionSeverity::Error]);
}

#[test]
fn observer_receives_stats_on_success() {
    let obs = Arc::new(RecordingObserver::default());

    analyze_path("tests/fixtures/subscriptions.csv", &opts_with(obs.clone())).unwrap();
    analyze_text("PLabc, PLabc, junk", &opts_with(obs.clone())).unwrap();

    let successes = obs.successes.lock().unwrap().clone();
    assert_eq!(successes.len(), 2);
    assert_eq!(successes[0].batch, 2);
    assert_eq!(successes[0].rejected_rows, 1);
    assert_eq!(successes[1].batch, 1);
    assert_eq!(successes[1].duplicates, 1);
    assert_eq!(successes[1].misses, 1);
    assert_eq!(*obs.modes.lock().unwrap(), vec![ImportMode::ReferenceTable, ImportMode::Auto]);
    assert!(obs.failures.lock().unwrap().is_empty());
}

#[test]
fn composite_observer_fans_out() {
    let a = Arc::new(RecordingObserver::default());
    let b = Arc::new(RecordingObserver::default());
    let composite = CompositeObserver::new(vec![a.clone(), b.clone()]);
    let opts = IngestionOptions {
        observer: Some(Arc::new(composite)),
        ..Default::default()
    };

    let _ = analyze_path("tests/fixtures/does_not_exist.txt", &opts).unwrap_err();

    assert_eq!(a.alerts.lock().unwrap().len(), 1);
    assert_eq!(b.alerts.lock().unwrap().len(), 1);
}

#[test]
fn file_observer_appends_lines() {
    let path = std::env::temp_dir().join(format!("refbatch-observer-{}.log", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let opts = IngestionOptions {
        observer: Some(Arc::new(FileObserver::new(&path))),
        ..Default::default()
    };

    analyze_text("PLabc", &opts).unwrap();
    let _ = analyze_path("tests/fixtures/does_not_exist.csv", &opts).unwrap_err();

    let log = std::fs::read_to_string(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains(" ok mode=Auto source=pasted text"));
    assert!(lines[1].contains(" fail severity=Critical"));
    assert!(lines[2].contains(" ALERT severity=Critical"));
}
