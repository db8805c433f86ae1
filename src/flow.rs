//! The invocable-flow capability.
//!
//! A [`Flow`] is anything a stage can hand the carried value to as a whole:
//! a locked [`Pipeline`](crate::pipeline::Pipeline) is the built-in one. Stages
//! wrap flows through [`Stage::nested`](crate::stage::Stage::nested) and
//! [`Stage::fan_out`](crate::stage::Stage::fan_out), so composing pipelines
//! needs no special casing in the executor.

use crate::error::Result;
use crate::stage::Carry;

/// A self-contained unit of execution over carried values.
pub trait Flow<T>: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Run one carried value through the flow.
    fn run(&self, input: Carry<T>) -> Result<Carry<T>>;

    /// Run every item through the flow, in whatever order the flow chooses.
    fn run_each(&self, items: Vec<T>) -> Result<Vec<Carry<T>>>;

    /// Whether any stage in this flow reads held values.
    ///
    /// A parallel pipeline refuses to lock around a flow that does.
    fn uses_references(&self) -> bool {
        false
    }
}

impl<T, F> Flow<T> for std::sync::Arc<F>
where
    F: Flow<T> + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run(&self, input: Carry<T>) -> Result<Carry<T>> {
        (**self).run(input)
    }

    fn run_each(&self, items: Vec<T>) -> Result<Vec<Carry<T>>> {
        (**self).run_each(items)
    }

    fn uses_references(&self) -> bool {
        (**self).uses_references()
    }
}
