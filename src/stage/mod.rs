//! Stages: the units of work a pipeline threads values through.
//!
//! A [`Stage`] bundles an action with the metadata the executor needs:
//!
//! - a [`CallShape`] deciding how the carried value becomes arguments
//! - an optional [`ResourcePermit`] acquired around the call in parallel mode
//! - an optional hold key under which the result is stored
//! - the held keys a [`CallShape::Referencing`] action receives
//!
//! # Example
//!
//! ```rust
//! use stagehand::stage::{Carry, Stage};
//!
//! let double = Stage::map(|x: i64| x * 2).named("double");
//! let total = Stage::spread(|xs: Vec<i64>| Ok(Carry::Single(xs.iter().sum())))
//!     .holding("total")
//!     .unwrap();
//!
//! assert_eq!(double.name(), "double");
//! assert_eq!(total.hold_key(), Some("total"));
//! ```

mod carry;
mod shape;

pub use carry::Carry;
pub use shape::{CallShape, GeneratorSource, StageResult};

use crate::error::{BoxError, Error, Result};
use crate::flow::Flow;
use crate::permit::ResourcePermit;
use crate::store::HeldStore;
use smallvec::SmallVec;
use std::sync::Arc;

/// One unit of work in a pipeline.
pub struct Stage<T> {
    name: String,
    shape: CallShape<T>,
    permit: Option<Arc<ResourcePermit>>,
    hold: Option<String>,
    references: SmallVec<[String; 2]>,
}

impl<T: Clone + Send + Sync + 'static> Stage<T> {
    /// Create a stage from an explicit call shape.
    pub fn new(shape: CallShape<T>) -> Self {
        let name = match &shape {
            CallShape::Nested(flow) | CallShape::FanOut(flow) => flow.name().to_string(),
            other => other.label().to_string(),
        };
        Self {
            name,
            shape,
            permit: None,
            hold: None,
            references: SmallVec::new(),
        }
    }

    /// A zero-argument stage returning a single value.
    pub fn produce<F>(f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new(CallShape::Producer(Arc::new(move || -> StageResult<T> {
            Ok(Carry::Single(f()))
        })))
    }

    /// A zero-argument stage with full control over its result.
    ///
    /// Returning `Ok(Carry::Empty)` models an action with no return value.
    pub fn producer<F>(f: F) -> Self
    where
        F: Fn() -> StageResult<T> + Send + Sync + 'static,
    {
        Self::new(CallShape::Producer(Arc::new(f)))
    }

    /// A stage mapping one value to one value.
    pub fn map<F>(f: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        Self::new(CallShape::Value(Arc::new(move |value: T| -> StageResult<T> {
            Ok(Carry::Single(f(value)))
        })))
        .named("map")
    }

    /// A fallible stage mapping one value to one value.
    pub fn try_map<F, E>(f: F) -> Self
    where
        F: Fn(T) -> std::result::Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::new(CallShape::Value(Arc::new(move |value: T| -> StageResult<T> {
            f(value).map(Carry::Single).map_err(Into::into)
        })))
        .named("try_map")
    }

    /// A stage taking one plain value and returning any carried value.
    pub fn value<F>(f: F) -> Self
    where
        F: Fn(T) -> StageResult<T> + Send + Sync + 'static,
    {
        Self::new(CallShape::Value(Arc::new(f)))
    }

    /// A stage receiving the carried value as-is, tuples included.
    pub fn whole<F>(f: F) -> Self
    where
        F: Fn(Carry<T>) -> StageResult<T> + Send + Sync + 'static,
    {
        Self::new(CallShape::Whole(Arc::new(f)))
    }

    /// A stage receiving the carried value's items as positional arguments.
    pub fn spread<F>(f: F) -> Self
    where
        F: Fn(Vec<T>) -> StageResult<T> + Send + Sync + 'static,
    {
        Self::new(CallShape::Spread(Arc::new(f)))
    }

    /// A stage receiving the carried value plus the values held under
    /// `keys`, in the order given.
    ///
    /// Pipelines running in parallel mode refuse to lock with such a stage.
    pub fn with_references<I, S, F>(keys: I, f: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(Carry<T>, Vec<Carry<T>>) -> StageResult<T> + Send + Sync + 'static,
    {
        let mut stage = Self::new(CallShape::Referencing(Arc::new(f)));
        stage.references = keys.into_iter().map(Into::into).collect();
        stage
    }

    /// A restartable generator: `f` is called afresh on every run.
    pub fn generator<F, I>(f: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
    {
        Self::new(CallShape::Generator(GeneratorSource::restartable(f)))
    }

    /// A one-shot generator draining `items` on its first run.
    pub fn generator_once<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::new(CallShape::Generator(GeneratorSource::once(items)))
    }

    /// A stage pushing the carried value through `flow`.
    pub fn nested<F>(flow: F) -> Self
    where
        F: Flow<T> + 'static,
    {
        Self::new(CallShape::Nested(Arc::new(flow)))
    }

    /// A stage processing each item of the carried value through `flow`.
    ///
    /// The results are flattened into a tuple. A parallel `flow` brings its
    /// own worker pool, on top of any pool the enclosing pipeline runs.
    pub fn fan_out<F>(flow: F) -> Self
    where
        F: Flow<T> + 'static,
    {
        Self::new(CallShape::FanOut(Arc::new(flow)))
    }

    /// Set the stage name used in diagnostics.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Guard this stage with a shared resource permit.
    ///
    /// The permit is only acquired when the enclosing pipeline runs in
    /// parallel mode.
    pub fn with_permit(mut self, permit: Arc<ResourcePermit>) -> Self {
        self.permit = Some(permit);
        self
    }

    /// Store this stage's result in the pipeline's held values under `key`.
    ///
    /// Fails with [`Error::InvalidHold`] when `key` is blank.
    pub fn holding(mut self, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(Error::InvalidHold { stage: self.name });
        }
        self.hold = Some(key);
        Ok(self)
    }

    /// Invoke the action with the carried value.
    pub(crate) fn invoke(
        &self,
        pipeline: &str,
        input: Carry<T>,
        store: &HeldStore<T>,
    ) -> Result<Carry<T>> {
        match &self.shape {
            CallShape::Producer(f) => f().map_err(Error::Action),
            CallShape::Value(f) => match input {
                Carry::Single(value) => f(value).map_err(Error::Action),
                other => Err(Error::CallShape {
                    stage: self.name.clone(),
                    expected: "a single value",
                    found: other.kind(),
                }),
            },
            CallShape::Whole(f) => f(input).map_err(Error::Action),
            CallShape::Spread(f) => f(input.into_vec()).map_err(Error::Action),
            CallShape::Referencing(f) => {
                if input.is_empty() {
                    return f(Carry::Empty, Vec::new()).map_err(Error::Action);
                }
                let held = self
                    .references
                    .iter()
                    .map(|key| store.retrieve(key))
                    .collect::<Result<Vec<_>>>()?;
                f(input, held).map_err(Error::Action)
            }
            CallShape::Generator(source) => match source.start() {
                Some(items) => Ok(Carry::Tuple(items.collect())),
                None => Err(Error::MissingGenerator {
                    pipeline: pipeline.to_string(),
                    reason: format!("one-shot generator '{}' was already drained", self.name),
                }),
            },
            CallShape::Nested(flow) => flow.run(input),
            CallShape::FanOut(flow) => {
                let results = flow.run_each(input.into_vec())?;
                Ok(results.into_iter().flat_map(Carry::into_vec).collect())
            }
        }
    }
}

impl<T> Stage<T> {
    /// Get the stage name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the call shape.
    pub fn shape(&self) -> &CallShape<T> {
        &self.shape
    }

    /// Get the permit guarding this stage, if any.
    pub fn permit(&self) -> Option<&Arc<ResourcePermit>> {
        self.permit.as_ref()
    }

    /// Get the key this stage holds its result under, if any.
    pub fn hold_key(&self) -> Option<&str> {
        self.hold.as_deref()
    }

    /// Get the held keys this stage references.
    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// Whether running this stage reads held values, directly or through a
    /// nested flow.
    pub fn uses_references(&self) -> bool {
        match &self.shape {
            CallShape::Nested(flow) | CallShape::FanOut(flow) => {
                !self.references.is_empty() || flow.uses_references()
            }
            _ => !self.references.is_empty(),
        }
    }
}

impl<T> Clone for Stage<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            shape: self.shape.clone(),
            permit: self.permit.clone(),
            hold: self.hold.clone(),
            references: self.references.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Stage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("permit", &self.permit.as_ref().map(|p| p.name()))
            .field("hold", &self.hold)
            .field("references", &self.references)
            .finish()
    }
}

impl<T> std::fmt::Display for Stage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.name, self.shape.label())?;
        if let Some(permit) = &self.permit {
            write!(f, " permit={}", permit.name())?;
        }
        if let Some(key) = &self.hold {
            write!(f, " hold={}", key)?;
        }
        if !self.references.is_empty() {
            write!(f, " refs={}", self.references.join(","))?;
        }
        Ok(())
    }
}
