//! Metric instrument factories for consistency-probe.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without an OTLP endpoint the global provider is a no-op.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("consistency-probe")
}

/// Counter: finished trials.
/// Labels: `outcome` ("success" | "point_read_failed" | "data_query_failed"
/// | "data_empty" | "locate_timed_out").
pub fn trials() -> Counter<u64> {
    meter()
        .u64_counter("probe.trials")
        .with_description("Number of finished trials by outcome")
        .build()
}

/// Counter: poller attempts.
/// Labels: `result` ("ok" | "error" | "cut_off").
pub fn poll_attempts() -> Counter<u64> {
    meter()
        .u64_counter("probe.poll.attempts")
        .with_description("Number of operation invocations made by the poller")
        .build()
}

/// Counter: cleanup (cancel) attempts.
/// Labels: `result` ("ok" | "not_found" | "error").
pub fn cleanups() -> Counter<u64> {
    meter()
        .u64_counter("probe.cleanup")
        .with_description("Number of unit-of-work cancellation attempts")
        .build()
}

/// Histogram: remote operation duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("probe.operation.duration_ms")
        .with_description("Remote operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
