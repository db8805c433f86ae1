//! Push and process for locked pipelines.

use super::{ExecutionMode, Locked, Pipeline};
use crate::error::{Error, Result};
use crate::flow::Flow;
use crate::observability::{instrument_pipeline, record_stage_invocation, span_stage};
use crate::permit::PermitGuard;
use crate::pool::WorkerPool;
use crate::stage::{CallShape, Carry};
use std::sync::Arc;
use std::time::Instant;

impl<T: Clone + Send + Sync + 'static> Pipeline<T, Locked> {
    /// Run one value through every stage.
    ///
    /// Pass `Carry::Empty` to start from nothing; the first stage then has
    /// to be a producer or generator. A failing stage
    /// aborts the push and its error is returned as-is. Held values written
    /// by earlier stages stay in the store.
    pub fn push(&self, value: impl Into<Carry<T>>) -> Result<Carry<T>> {
        self.push_from(value, 0)
    }

    /// Run one value through the stages starting at index `start`.
    pub fn push_from(&self, value: impl Into<Carry<T>>, start: usize) -> Result<Carry<T>> {
        let _timer = self.metrics.start_timer();
        let result = self.run_stages(value.into(), start);
        self.metrics.record_push(result.is_ok());
        result
    }

    fn run_stages(&self, mut value: Carry<T>, start: usize) -> Result<Carry<T>> {
        let parallel = self.is_parallel();
        for (index, stage) in self.stages.iter().enumerate().skip(start) {
            let span = span_stage(self.name(), stage.name(), index);
            let _entered = span.enter();

            // Permits only matter when flows run side by side.
            let _permit: Option<PermitGuard<'_>> = match stage.permit() {
                Some(permit) if parallel => Some(permit.guard()),
                _ => None,
            };

            let started = Instant::now();
            value = stage.invoke(self.name(), value, &self.store)?;
            record_stage_invocation(self.name(), stage.name(), started.elapsed());

            if let Some(key) = stage.hold_key() {
                self.store.hold(key, value.clone());
            }
        }
        Ok(value)
    }

    /// Push every item through the whole pipeline.
    ///
    /// Sequential mode returns results in input order and stops at the first
    /// failure. Parallel mode returns results in completion order; every
    /// item runs to completion and the first failure collected is returned.
    pub fn process(&self, items: impl IntoIterator<Item = T>) -> Result<Vec<Carry<T>>> {
        self.process_from(items.into_iter().map(Carry::Single), 0)
    }

    /// Push every item and keep each item's own outcome.
    ///
    /// Unlike [`process`](Self::process), no failure stops other items. The
    /// outer error only reports a worker pool that could not start.
    pub fn process_each(
        &self,
        items: impl IntoIterator<Item = T>,
    ) -> Result<Vec<Result<Carry<T>>>> {
        let _span = instrument_pipeline(self.name(), self.mode().label());
        let items = items.into_iter().map(Carry::Single);
        let results = match self.mode() {
            ExecutionMode::Sequential => items.map(|item| self.push_from(item, 0)).collect(),
            ExecutionMode::Parallel { workers } => {
                WorkerPool::new(self.name(), workers).run(items, |item| self.push_from(item, 0))?
            }
        };
        self.metrics.record_items(results.len() as u64);
        Ok(results)
    }

    /// Process the items produced by the first stage.
    ///
    /// The first stage must be a generator; each item it yields is pushed
    /// from the second stage on. Fails with [`Error::MissingGenerator`] when
    /// the first stage is something else, when the pipeline is empty, or
    /// when a one-shot generator was already drained.
    pub fn process_generated(&self) -> Result<Vec<Carry<T>>> {
        let Some(first) = self.stages.first() else {
            return Err(self.missing_generator("the pipeline has no stages".to_string()));
        };
        let CallShape::Generator(source) = first.shape() else {
            return Err(self.missing_generator(format!(
                "stage '{}' is a {} stage",
                first.name(),
                first.shape().label()
            )));
        };
        let items = source.start().ok_or_else(|| {
            self.missing_generator(format!("generator '{}' was already drained", first.name()))
        })?;
        self.process_from(items.map(Carry::Single), 1)
    }

    /// Run [`process`](Self::process) on tokio's blocking thread pool.
    pub async fn process_async<I>(self: Arc<Self>, items: I) -> Result<Vec<Carry<T>>>
    where
        I: IntoIterator<Item = T> + Send + 'static,
    {
        tokio::task::spawn_blocking(move || self.process(items))
            .await
            .map_err(|e| Error::Join(e.to_string()))?
    }

    fn process_from<I>(&self, items: I, start: usize) -> Result<Vec<Carry<T>>>
    where
        I: Iterator<Item = Carry<T>>,
    {
        let _span = instrument_pipeline(self.name(), self.mode().label());
        tracing::debug!(pipeline = %self.name(), mode = %self.mode(), start, "processing started");

        let results = match self.mode() {
            ExecutionMode::Sequential => {
                let mut results = Vec::new();
                for item in items {
                    let result = self.push_from(item, start);
                    self.metrics.record_items(1);
                    results.push(result?);
                }
                results
            }
            ExecutionMode::Parallel { workers } => {
                let outcomes = WorkerPool::new(self.name(), workers)
                    .run(items, |item| self.push_from(item, start))?;
                self.metrics.record_items(outcomes.len() as u64);
                outcomes.into_iter().collect::<Result<Vec<_>>>()?
            }
        };

        tracing::debug!(pipeline = %self.name(), items = results.len(), "processing finished");
        Ok(results)
    }

    fn missing_generator(&self, reason: String) -> Error {
        Error::MissingGenerator {
            pipeline: self.name().to_string(),
            reason,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Flow<T> for Pipeline<T, Locked> {
    fn name(&self) -> &str {
        Pipeline::name(self)
    }

    fn run(&self, input: Carry<T>) -> Result<Carry<T>> {
        self.push(input)
    }

    fn run_each(&self, items: Vec<T>) -> Result<Vec<Carry<T>>> {
        self.process(items)
    }

    fn uses_references(&self) -> bool {
        self.stages.iter().any(|stage| stage.uses_references())
    }
}
