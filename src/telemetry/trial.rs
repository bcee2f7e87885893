//! Trial span helpers.
//!
//! Every trial runs inside one span. Stage changes are events on it; the
//! final outcome is recorded on the span once, when the trial ends.

use tracing::Span;

/// Start a span for one trial.
///
/// The `trial.outcome` field is declared empty and is filled by
/// [`record_outcome`].
pub fn start_trial_span(index: u32, total: u32, tag: &str) -> Span {
    tracing::info_span!(
        "probe.trial",
        "trial.index" = index,
        "trial.total" = total,
        "trial.tag" = tag,
        "trial.outcome" = tracing::field::Empty,
    )
}

/// Emit a stage change event scoped to the trial span.
pub fn record_stage(span: &Span, from: &str, to: &str) {
    span.in_scope(|| {
        tracing::debug!(from = from, to = to, "stage_transition");
    });
}

/// Record how the trial ended. Call once per span.
pub fn record_outcome(span: &Span, outcome: &str) {
    span.record("trial.outcome", outcome);
}
