//! Metrics collection using metrics-rs.

use metrics::{Counter, Histogram, Unit, counter, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Whether metrics have been initialized.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

const PUSHES_TOTAL: &str = "stagehand_pushes_total";
const PUSH_FAILURES_TOTAL: &str = "stagehand_push_failures_total";
const ITEMS_PROCESSED_TOTAL: &str = "stagehand_items_processed_total";
const STAGE_INVOCATIONS_TOTAL: &str = "stagehand_stage_invocations_total";
const STAGE_TIME_NS: &str = "stagehand_stage_time_ns";
const PUSH_TIME_NS: &str = "stagehand_push_time_ns";
const PERMIT_WAIT_NS: &str = "stagehand_permit_wait_ns";
const PERMITS_AVAILABLE: &str = "stagehand_permits_available";

/// Initialize metrics descriptions.
///
/// Call this once at application startup before using any metrics.
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    metrics::describe_counter!(
        PUSHES_TOTAL,
        Unit::Count,
        "Total number of items pushed through a pipeline"
    );
    metrics::describe_counter!(
        PUSH_FAILURES_TOTAL,
        Unit::Count,
        "Total number of pushes aborted by an error"
    );
    metrics::describe_counter!(
        ITEMS_PROCESSED_TOTAL,
        Unit::Count,
        "Total number of items handled by process calls"
    );
    metrics::describe_counter!(
        STAGE_INVOCATIONS_TOTAL,
        Unit::Count,
        "Total number of stage invocations"
    );
    metrics::describe_histogram!(
        STAGE_TIME_NS,
        Unit::Nanoseconds,
        "Time spent inside a single stage invocation"
    );
    metrics::describe_histogram!(
        PUSH_TIME_NS,
        Unit::Nanoseconds,
        "Time spent pushing one item through a whole pipeline"
    );
    metrics::describe_histogram!(
        PERMIT_WAIT_NS,
        Unit::Nanoseconds,
        "Time spent waiting to acquire a resource permit"
    );
    metrics::describe_gauge!(
        PERMITS_AVAILABLE,
        Unit::Count,
        "Units currently available on a resource permit"
    );
}

/// Record a stage invocation and the time it took.
#[inline]
pub fn record_stage_invocation(pipeline: &str, stage: &str, duration: Duration) {
    counter!(STAGE_INVOCATIONS_TOTAL, "pipeline" => pipeline.to_string(), "stage" => stage.to_string())
        .increment(1);
    histogram!(STAGE_TIME_NS, "pipeline" => pipeline.to_string(), "stage" => stage.to_string())
        .record(duration.as_nanos() as f64);
}

/// Record how long a caller waited for a permit.
#[inline]
pub fn record_permit_wait(permit: &str, duration: Duration) {
    histogram!(PERMIT_WAIT_NS, "permit" => permit.to_string()).record(duration.as_nanos() as f64);
}

/// Record the units currently available on a permit.
#[inline]
pub fn record_permits_available(permit: &str, available: usize) {
    gauge!(PERMITS_AVAILABLE, "permit" => permit.to_string()).set(available as f64);
}

/// Metrics collector for a single pipeline.
///
/// Counters are resolved once at construction so the hot path only
/// increments handles.
#[derive(Clone)]
pub struct PipelineMetrics {
    name: String,
    pushes: Counter,
    failures: Counter,
    items: Counter,
    push_time: Histogram,
}

impl PipelineMetrics {
    /// Create a new pipeline metrics collector.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pushes: counter!(PUSHES_TOTAL, "pipeline" => name.to_string()),
            failures: counter!(PUSH_FAILURES_TOTAL, "pipeline" => name.to_string()),
            items: counter!(ITEMS_PROCESSED_TOTAL, "pipeline" => name.to_string()),
            push_time: histogram!(PUSH_TIME_NS, "pipeline" => name.to_string()),
        }
    }

    /// Record the outcome of one push.
    #[inline]
    pub fn record_push(&self, ok: bool) {
        self.pushes.increment(1);
        if !ok {
            self.failures.increment(1);
        }
    }

    /// Record items handed to a process call.
    #[inline]
    pub fn record_items(&self, count: u64) {
        self.items.increment(count);
    }

    /// Start a timer covering a whole push; records on drop.
    pub fn start_timer(&self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            histogram: &self.push_time,
        }
    }

    /// Get the pipeline name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for PipelineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineMetrics")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Guard that records elapsed time when dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    histogram: &'a Histogram,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.histogram
            .record(self.start.elapsed().as_nanos() as f64);
    }
}
