//! Error types for Stagehand.

use thiserror::Error;

/// Result type alias using Stagehand's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by user-supplied stage actions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for Stagehand operations.
///
/// Structural misuse (appending to a locked pipeline, executing a pipeline
/// that was never locked, combining incompatible operands) is rejected by the
/// type system and has no variant here.
#[derive(Error, Debug)]
pub enum Error {
    /// A stage asked to hold its result without naming a key.
    #[error("invalid hold declaration for stage '{stage}': a hold needs a non-empty key")]
    InvalidHold {
        /// Name of the offending stage.
        stage: String,
    },

    /// A parallel pipeline contains a stage that reads held values.
    #[error(
        "stage '{stage}' cannot reference held values because pipeline '{pipeline}' runs in parallel mode"
    )]
    ParallelReference {
        /// Name of the pipeline being locked.
        pipeline: String,
        /// Name of the offending stage.
        stage: String,
    },

    /// A parallel pipeline was configured without any worker.
    #[error("pipeline '{pipeline}' needs at least one worker")]
    InvalidWorkerLimit {
        /// Name of the pipeline being locked.
        pipeline: String,
    },

    /// `process_generated` was called but the first stage cannot produce items.
    #[error("pipeline '{pipeline}' has no generator at its first stage: {reason}")]
    MissingGenerator {
        /// Name of the pipeline.
        pipeline: String,
        /// Why the first stage cannot be used.
        reason: String,
    },

    /// A resource permit was created with a capacity of zero.
    #[error("resource permit '{name}' needs a capacity of at least 1")]
    InvalidCapacity {
        /// Permit name.
        name: String,
    },

    /// A resource permit was released more often than it was acquired.
    #[error("resource permit '{name}' released beyond its capacity of {capacity}")]
    PermitOverflow {
        /// Permit name.
        name: String,
        /// Permit capacity.
        capacity: usize,
    },

    /// Waiting for a resource permit took longer than allowed.
    #[error("timed out waiting for resource permit '{name}'")]
    PermitTimeout {
        /// Permit name.
        name: String,
    },

    /// No value is held under the requested key.
    #[error("no value held under key '{0}'")]
    MissingHeld(String),

    /// A stage received a carried value it cannot be called with.
    #[error("stage '{stage}' accepts {expected} but received {found}")]
    CallShape {
        /// Name of the stage.
        stage: String,
        /// What the stage's call shape accepts.
        expected: &'static str,
        /// What was actually carried into the stage.
        found: &'static str,
    },

    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// A blocking task bridged into async code failed to complete.
    #[error("blocking task failed: {0}")]
    Join(String),

    /// Error raised by a stage action, passed through untouched.
    #[error(transparent)]
    Action(BoxError),
}

impl Error {
    /// Returns the error raised by a stage action, if this is one.
    pub fn as_action(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Error::Action(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }
}
