//! Observability features: metrics and tracing.
//!
//! - **Metrics**: Counters, gauges, and histograms via `metrics-rs`
//! - **Tracing**: Structured logging and spans via `tracing`
//!
//! ## Metrics
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `stagehand_pushes_total` | Counter | Items pushed through a pipeline |
//! | `stagehand_push_failures_total` | Counter | Pushes aborted by an error |
//! | `stagehand_items_processed_total` | Counter | Items handled by process calls |
//! | `stagehand_stage_invocations_total` | Counter | Stage invocations |
//! | `stagehand_stage_time_ns` | Histogram | Time per stage invocation |
//! | `stagehand_push_time_ns` | Histogram | Time per whole push |
//! | `stagehand_permit_wait_ns` | Histogram | Time spent waiting for a permit |
//! | `stagehand_permits_available` | Gauge | Units left on a permit |
//!
//! ## Tracing
//!
//! Stagehand emits a span per pipeline run and per stage invocation. Stage
//! failures are returned to the caller and never logged by the engine.
//!
//! ## Example
//!
//! ```rust,ignore
//! use stagehand::observability::init_metrics;
//!
//! // Describe metrics once at startup, then install any metrics exporter.
//! init_metrics();
//! ```

mod metrics;
mod tracing_support;

pub use self::metrics::{
    PipelineMetrics, TimerGuard, init_metrics, record_permit_wait, record_permits_available,
    record_stage_invocation,
};
pub use self::tracing_support::{instrument_pipeline, span_pipeline, span_stage, trace_lock_change};
