//! Integration tests for telemetry initialization and span helpers.

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use consistency_probe::client::{SimClient, SimProfile};
use consistency_probe::config::ProbeConfig;
use consistency_probe::harness::Harness;
use consistency_probe::telemetry::trial::{record_outcome, record_stage, start_trial_span};
use tracing::subscriber::DefaultGuard;

#[test]
fn telemetry_initializes_without_endpoint() {
    // A global subscriber can only be set once per process; a second
    // initialization in the same binary returns Err, which is acceptable.
    let config = consistency_probe::telemetry::TelemetryConfig {
        endpoint: None,
        service_name: "consistency-probe-test".to_string(),
        log_level: "debug".to_string(),
    };
    if let Ok(guard) = consistency_probe::telemetry::init_telemetry(config) {
        assert!(!guard.is_exporting());
    }
}

/// Shared buffer the fmt layer writes into.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap().lines().map(str::to_owned).collect()
    }
}

fn capture_logs() -> (Captured, DefaultGuard) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (captured, tracing::subscriber::set_default(subscriber))
}

#[test]
fn trial_span_records_outcome_once() {
    let (captured, _guard) = capture_logs();

    let span = start_trial_span(3, 100, "test-3");
    record_stage(&span, "created", "locating");
    record_stage(&span, "locating", "located");
    record_stage(&span, "located", "point_reading");
    record_outcome(&span, "success");
    span.in_scope(|| tracing::info!("after outcome"));

    let lines = captured.lines();
    assert_eq!(lines.iter().filter(|l| l.contains("stage_transition")).count(), 3);
    let last = lines.last().unwrap();
    assert!(last.contains("after outcome"));
    assert_eq!(last.matches("trial.outcome=").count(), 1);
    assert!(lines.iter().all(|l| !l.contains("trial.stage")));
}

#[tokio::test(start_paused = true)]
async fn trial_log_lines_do_not_accumulate_fields() {
    let (captured, _guard) = capture_logs();

    let sim = Arc::new(SimClient::new(SimProfile {
        point_read_missing_every: Some(2),
        ..SimProfile::default()
    }));
    let config = ProbeConfig {
        trials: 2,
        fixtures: vec![PathBuf::from("fixtures/test-tasks-query.bpmn")],
        ..ProbeConfig::default()
    };
    Harness::new(sim, config).unwrap().run().await.unwrap();

    let lines = captured.lines();
    assert!(lines.iter().any(|l| l.contains("stage_transition")));
    for line in &lines {
        assert!(line.matches("trial.outcome=").count() <= 1, "{line}");
        assert!(!line.contains("trial.stage"), "{line}");
        assert!(line.matches("trial.index=").count() <= 1, "{line}");
    }
}
