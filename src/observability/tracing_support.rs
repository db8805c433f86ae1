//! Tracing integration for structured logging and spans.

use tracing::{Level, Span, span};

/// Create a span for a pipeline run.
///
/// # Example
///
/// ```rust,ignore
/// use stagehand::observability::span_pipeline;
///
/// let span = span_pipeline("ingest", "parallel");
/// let _guard = span.enter();
/// // Processing here...
/// ```
#[inline]
pub fn span_pipeline(name: &str, mode: &str) -> Span {
    span!(Level::DEBUG, "pipeline", name = %name, mode = %mode)
}

/// Create a span for one stage invocation.
#[inline]
pub fn span_stage(pipeline: &str, stage: &str, index: usize) -> Span {
    span!(
        Level::TRACE,
        "stage",
        pipeline = %pipeline,
        stage = %stage,
        index = index
    )
}

/// Enter a pipeline span and return the guard.
pub fn instrument_pipeline(name: &str, mode: &str) -> tracing::span::EnteredSpan {
    span_pipeline(name, mode).entered()
}

/// Log a pipeline lock-state transition.
#[inline]
pub fn trace_lock_change(pipeline: &str, from: &str, to: &str) {
    tracing::debug!(
        pipeline = %pipeline,
        from = %from,
        to = %to,
        "pipeline lock state changed"
    );
}
