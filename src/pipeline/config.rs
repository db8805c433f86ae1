//! Pipeline configuration.

/// Worker count used by [`ExecutionMode::parallel`].
pub const DEFAULT_WORKERS: usize = 6;

/// How `process` spreads items over threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecutionMode {
    /// One item at a time on the calling thread, in input order.
    #[default]
    Sequential,
    /// Up to `workers` items at once; results in completion order.
    Parallel {
        /// Size of the worker pool.
        workers: usize,
    },
}

impl ExecutionMode {
    /// Parallel mode with [`DEFAULT_WORKERS`] workers.
    pub fn parallel() -> Self {
        ExecutionMode::Parallel {
            workers: DEFAULT_WORKERS,
        }
    }

    /// Whether items are processed concurrently.
    pub fn is_parallel(&self) -> bool {
        matches!(self, ExecutionMode::Parallel { .. })
    }

    /// Number of items that may be in flight at once.
    pub fn workers(&self) -> usize {
        match self {
            ExecutionMode::Sequential => 1,
            ExecutionMode::Parallel { workers } => *workers,
        }
    }

    /// Short label used in spans and logs.
    pub fn label(&self) -> &'static str {
        match self {
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Parallel { .. } => "parallel",
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Sequential => f.write_str("sequential"),
            ExecutionMode::Parallel { workers } => write!(f, "parallel({})", workers),
        }
    }
}

/// Configuration for a [`Pipeline`](super::Pipeline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Name used in logs, spans and metric labels.
    pub name: String,

    /// Execution mode for `process`.
    pub mode: ExecutionMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "pipeline".to_string(),
            mode: ExecutionMode::Sequential,
        }
    }
}

impl PipelineConfig {
    /// Sequential config with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parallel config with `workers` workers.
    ///
    /// A worker count of zero is accepted here and rejected when the
    /// pipeline is locked.
    pub fn parallel(workers: usize) -> Self {
        Self {
            mode: ExecutionMode::Parallel { workers },
            ..Default::default()
        }
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the execution mode.
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }
}
