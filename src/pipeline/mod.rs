//! Pipeline construction and execution.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s in one of two states:
//!
//! - [`Building`]: stages can be added, inserted and merged
//! - [`Locked`]: the structure is frozen and items can be pushed or processed
//!
//! [`lock`](Pipeline::lock) validates the structure and moves a pipeline
//! from the first state to the second.
//!
//! # Example
//!
//! ```rust
//! use stagehand::prelude::*;
//!
//! let pipeline = (Stage::map(|x: i64| x + 1) >> Stage::map(|x: i64| x * 10))
//!     .lock()
//!     .unwrap();
//!
//! assert_eq!(pipeline.push(1_i64).unwrap(), Carry::Single(20));
//! ```
//!
//! A locked pipeline cannot grow:
//!
//! ```rust,compile_fail
//! use stagehand::prelude::*;
//!
//! let mut pipeline = Pipeline::<i64>::new().lock().unwrap();
//! pipeline.add(Stage::map(|x: i64| x));
//! ```
//!
//! and a pipeline that was never locked cannot run:
//!
//! ```rust,compile_fail
//! use stagehand::prelude::*;
//!
//! let mut pipeline = Pipeline::new();
//! pipeline.add(Stage::map(|x: i64| x));
//! pipeline.push(1_i64);
//! ```
//!
//! Only stages and pipelines of the same item type compose:
//!
//! ```rust,compile_fail
//! use stagehand::prelude::*;
//!
//! let pipeline = Stage::map(|x: i64| x) >> 5_i64;
//! ```

mod compose;
mod config;
mod exec;

pub use config::{DEFAULT_WORKERS, ExecutionMode, PipelineConfig};

use crate::error::{Error, Result};
use crate::observability::{PipelineMetrics, trace_lock_change};
use crate::stage::{Carry, Stage};
use crate::store::HeldStore;
use std::marker::PhantomData;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Building {}
    impl Sealed for super::Locked {}
}

/// Lock state of a [`Pipeline`].
pub trait LockState: sealed::Sealed + Send + Sync + 'static {
    /// Name used in logs.
    const NAME: &'static str;
}

/// State of a pipeline whose structure can still change.
#[derive(Debug, Clone, Copy, Default)]
pub struct Building;

/// State of a pipeline whose structure is frozen and which can execute.
#[derive(Debug, Clone, Copy, Default)]
pub struct Locked;

impl LockState for Building {
    const NAME: &'static str = "building";
}

impl LockState for Locked {
    const NAME: &'static str = "locked";
}

/// An ordered sequence of stages sharing one held-value store.
pub struct Pipeline<T, S: LockState = Building> {
    config: PipelineConfig,
    stages: Vec<Stage<T>>,
    store: HeldStore<T>,
    metrics: PipelineMetrics,
    _state: PhantomData<S>,
}

impl<T: Clone + Send + Sync + 'static> Pipeline<T, Building> {
    /// Create an empty sequential pipeline.
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    /// Create an empty pipeline with the given configuration.
    pub fn with_config(config: PipelineConfig) -> Self {
        Self::from_stages(Vec::new(), config)
    }

    /// Create a pipeline from an initial list of stages.
    pub fn from_stages(stages: impl IntoIterator<Item = Stage<T>>, config: PipelineConfig) -> Self {
        let metrics = PipelineMetrics::new(&config.name);
        Self {
            config,
            stages: stages.into_iter().collect(),
            store: HeldStore::new(),
            metrics,
            _state: PhantomData,
        }
    }

    /// Append a stage.
    pub fn add(&mut self, stage: Stage<T>) -> &mut Self {
        self.stages.push(stage);
        self
    }

    /// Append a stage, builder style.
    pub fn then(mut self, stage: Stage<T>) -> Self {
        self.add(stage);
        self
    }

    /// Insert a stage at `position`, clamped to the current length.
    pub fn insert(&mut self, position: usize, stage: Stage<T>) -> &mut Self {
        let position = position.min(self.stages.len());
        self.stages.insert(position, stage);
        self
    }

    /// Append every stage of `other`, leaving its held values behind.
    pub fn merge(&mut self, other: Pipeline<T, Building>) -> &mut Self {
        tracing::debug!(
            pipeline = %self.config.name,
            other = %other.config.name,
            stages = other.stages.len(),
            "merging pipeline"
        );
        self.stages.extend(other.stages);
        self
    }

    /// Append a locked pipeline as a single nested stage.
    pub fn nest(&mut self, inner: Pipeline<T, Locked>) -> &mut Self {
        self.add(Stage::nested(inner))
    }

    /// Change the execution mode.
    pub fn set_mode(&mut self, mode: ExecutionMode) -> &mut Self {
        self.config.mode = mode;
        self
    }

    /// Rename the pipeline.
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.config.name = name.into();
        self.metrics = PipelineMetrics::new(&self.config.name);
        self
    }

    /// Validate the structure and freeze it.
    ///
    /// A parallel pipeline fails with [`Error::InvalidWorkerLimit`] when it
    /// has no worker, and with [`Error::ParallelReference`] when any stage
    /// reads held values, directly or through a nested pipeline.
    pub fn lock(self) -> Result<Pipeline<T, Locked>> {
        if let ExecutionMode::Parallel { workers } = self.config.mode {
            if workers == 0 {
                return Err(Error::InvalidWorkerLimit {
                    pipeline: self.config.name,
                });
            }
            if let Some(stage) = self.stages.iter().find(|stage| stage.uses_references()) {
                return Err(Error::ParallelReference {
                    pipeline: self.config.name.clone(),
                    stage: stage.name().to_string(),
                });
            }
        }
        trace_lock_change(&self.config.name, Building::NAME, Locked::NAME);
        Ok(self.into_state())
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Pipeline<T, Building> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> Pipeline<T, Locked> {
    /// Locking an already locked pipeline changes nothing.
    pub fn lock(self) -> Self {
        self
    }

    /// Unfreeze the structure.
    ///
    /// Pipelines are not expected to change once they have run, so this
    /// always logs at error level. Validation done by the earlier
    /// [`lock`](Pipeline::lock) is not undone.
    pub fn unlock(self) -> Pipeline<T, Building> {
        tracing::error!(
            pipeline = %self.config.name,
            stages = self.stages.len(),
            "unlocking a locked pipeline"
        );
        trace_lock_change(&self.config.name, Locked::NAME, Building::NAME);
        self.into_state()
    }
}

impl<T, S: LockState> Pipeline<T, S> {
    /// Get the pipeline name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Get the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Get the execution mode.
    pub fn mode(&self) -> ExecutionMode {
        self.config.mode
    }

    /// Whether `process` runs items concurrently.
    pub fn is_parallel(&self) -> bool {
        self.config.mode.is_parallel()
    }

    /// Number of items `process` may run at once.
    pub fn workers(&self) -> usize {
        self.config.mode.workers()
    }

    /// Whether the structure is frozen.
    pub fn is_locked(&self) -> bool {
        S::NAME == Locked::NAME
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline has no stage.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Get the stages in execution order.
    pub fn stages(&self) -> &[Stage<T>] {
        &self.stages
    }

    /// Get the held-value store.
    pub fn store(&self) -> &HeldStore<T> {
        &self.store
    }

    /// Store `value` under `key` in the held-value store.
    pub fn hold(&self, key: impl Into<String>, value: impl Into<Carry<T>>) {
        self.store.hold(key, value);
    }

    fn into_state<S2: LockState>(self) -> Pipeline<T, S2> {
        Pipeline {
            config: self.config,
            stages: self.stages,
            store: self.store,
            metrics: self.metrics,
            _state: PhantomData,
        }
    }
}

impl<T: Clone, S: LockState> Pipeline<T, S> {
    /// Get a copy of the value held under `key`.
    pub fn retrieve(&self, key: &str) -> Result<Carry<T>> {
        self.store.retrieve(key)
    }
}

impl<T: Clone, S: LockState> Clone for Pipeline<T, S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            stages: self.stages.clone(),
            store: self.store.clone(),
            metrics: self.metrics.clone(),
            _state: PhantomData,
        }
    }
}

impl<T, S: LockState> std::fmt::Debug for Pipeline<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.config.name)
            .field("mode", &self.config.mode)
            .field("state", &S::NAME)
            .field("stages", &self.stages)
            .field("store", &self.store)
            .finish()
    }
}

impl<T, S: LockState> std::fmt::Display for Pipeline<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {}):", self.config.name, self.config.mode, S::NAME)?;
        for (index, stage) in self.stages.iter().enumerate() {
            let sep = if index == 0 { " " } else { " >> " };
            write!(f, "{}{}", sep, stage)?;
        }
        Ok(())
    }
}
