//! Call shapes: how a stage's action is invoked with the carried value.

use std::sync::{Arc, Mutex, PoisonError};

use super::Carry;
use crate::error::BoxError;
use crate::flow::Flow;

/// What a stage action returns.
pub type StageResult<T> = std::result::Result<Carry<T>, BoxError>;

type ProducerFn<T> = dyn Fn() -> StageResult<T> + Send + Sync;
type ValueFn<T> = dyn Fn(T) -> StageResult<T> + Send + Sync;
type WholeFn<T> = dyn Fn(Carry<T>) -> StageResult<T> + Send + Sync;
type SpreadFn<T> = dyn Fn(Vec<T>) -> StageResult<T> + Send + Sync;
type ReferencingFn<T> = dyn Fn(Carry<T>, Vec<Carry<T>>) -> StageResult<T> + Send + Sync;
type IterFactory<T> = dyn Fn() -> Box<dyn Iterator<Item = T>> + Send + Sync;
type OnceIter<T> = Mutex<Option<Box<dyn Iterator<Item = T> + Send>>>;

/// The way a stage's action takes its arguments, fixed at construction.
pub enum CallShape<T> {
    /// Zero arguments. Any carried value is ignored.
    Producer(Arc<ProducerFn<T>>),
    /// Exactly one plain value.
    Value(Arc<ValueFn<T>>),
    /// The carried value as-is; a tuple arrives packed as one argument.
    Whole(Arc<WholeFn<T>>),
    /// The carried value's items as positional arguments.
    Spread(Arc<SpreadFn<T>>),
    /// The carried value followed by referenced held values.
    Referencing(Arc<ReferencingFn<T>>),
    /// A lazy sequence of items; drives `process_generated` from the first stage.
    Generator(GeneratorSource<T>),
    /// A flow the carried value is pushed through.
    Nested(Arc<dyn Flow<T>>),
    /// A flow every item of the carried value is processed through.
    FanOut(Arc<dyn Flow<T>>),
}

impl<T> CallShape<T> {
    /// Short label for this shape.
    pub fn label(&self) -> &'static str {
        match self {
            CallShape::Producer(_) => "producer",
            CallShape::Value(_) => "value",
            CallShape::Whole(_) => "whole",
            CallShape::Spread(_) => "spread",
            CallShape::Referencing(_) => "referencing",
            CallShape::Generator(_) => "generator",
            CallShape::Nested(_) => "nested",
            CallShape::FanOut(_) => "fan-out",
        }
    }

    /// Whether this shape can seed `process_generated`.
    pub fn is_generator(&self) -> bool {
        matches!(self, CallShape::Generator(_))
    }
}

impl<T> Clone for CallShape<T> {
    fn clone(&self) -> Self {
        match self {
            CallShape::Producer(f) => CallShape::Producer(Arc::clone(f)),
            CallShape::Value(f) => CallShape::Value(Arc::clone(f)),
            CallShape::Whole(f) => CallShape::Whole(Arc::clone(f)),
            CallShape::Spread(f) => CallShape::Spread(Arc::clone(f)),
            CallShape::Referencing(f) => CallShape::Referencing(Arc::clone(f)),
            CallShape::Generator(source) => CallShape::Generator(source.clone()),
            CallShape::Nested(flow) => CallShape::Nested(Arc::clone(flow)),
            CallShape::FanOut(flow) => CallShape::FanOut(Arc::clone(flow)),
        }
    }
}

impl<T> std::fmt::Debug for CallShape<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallShape::Nested(flow) | CallShape::FanOut(flow) => {
                write!(f, "{}({})", self.label(), flow.name())
            }
            _ => f.write_str(self.label()),
        }
    }
}

/// Where a generator stage gets its items from.
pub enum GeneratorSource<T> {
    /// A factory called afresh on every run.
    Restartable(Arc<IterFactory<T>>),
    /// An iterator that can be drained exactly once.
    Once(Arc<OnceIter<T>>),
}

impl<T: 'static> GeneratorSource<T> {
    /// Build a restartable source from an iterator factory.
    pub fn restartable<F, I>(make: F) -> Self
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
    {
        let factory: Arc<IterFactory<T>> = Arc::new(move || {
            let items: Box<dyn Iterator<Item = T>> = Box::new(make().into_iter());
            items
        });
        GeneratorSource::Restartable(factory)
    }

    /// Build a one-shot source from an iterator.
    pub fn once<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        let items: Box<dyn Iterator<Item = T> + Send> = Box::new(items.into_iter());
        GeneratorSource::Once(Arc::new(Mutex::new(Some(items))))
    }

    /// Start producing items.
    ///
    /// Returns `None` once a one-shot source has been drained.
    pub fn start(&self) -> Option<Box<dyn Iterator<Item = T>>> {
        match self {
            GeneratorSource::Restartable(factory) => Some(factory()),
            GeneratorSource::Once(slot) => slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .map(|items| -> Box<dyn Iterator<Item = T>> { items }),
        }
    }
}

impl<T> Clone for GeneratorSource<T> {
    fn clone(&self) -> Self {
        match self {
            GeneratorSource::Restartable(factory) => {
                GeneratorSource::Restartable(Arc::clone(factory))
            }
            GeneratorSource::Once(slot) => GeneratorSource::Once(Arc::clone(slot)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restartable_generator_restarts() {
        let source = GeneratorSource::restartable(|| 0..3);
        assert_eq!(source.start().unwrap().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(source.start().unwrap().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_once_generator_drains_once() {
        let source = GeneratorSource::once(vec!['a', 'b']);
        let copy = source.clone();
        assert_eq!(source.start().unwrap().collect::<String>(), "ab");
        assert!(copy.start().is_none());
    }

    #[test]
    fn test_labels() {
        let shape: CallShape<u8> = CallShape::Producer(Arc::new(|| Ok(Carry::Empty)));
        assert_eq!(shape.label(), "producer");
        assert!(!shape.is_generator());
        let shape: CallShape<u8> = CallShape::Generator(GeneratorSource::restartable(|| 0..1));
        assert!(shape.is_generator());
        assert_eq!(format!("{:?}", shape), "generator");
    }
}
