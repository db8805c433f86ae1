//! # Stagehand
//!
//! Composable stage pipelines with bounded parallel processing.
//!
//! A pipeline threads a carried value through an ordered list of stages. Each
//! stage declares up front how it takes that value (nothing, one value, a
//! whole tuple, spread items, or a value plus held results of earlier
//! stages), so no argument inspection happens at run time.
//!
//! ## Features
//!
//! - **Typestate lifecycle**: only locked pipelines run, only building ones grow
//! - **Bounded parallelism**: a fixed worker pool per `process` call
//! - **Resource permits**: cap how many flows touch a scarce resource at once
//! - **Held values**: pass side results between stages of one flow
//! - **Nesting**: locked pipelines are stages too, via the [`flow::Flow`] trait
//!
//! ## Quick Start
//!
//! ```rust
//! use stagehand::prelude::*;
//!
//! let gpu = ResourcePermit::shared("gpu", 2)?;
//!
//! let pipeline = Pipeline::with_config(PipelineConfig::parallel(4).with_name("render"))
//!     >> Stage::map(|x: u64| x * 2)
//!     >> Stage::map(|x: u64| x + 1).named("shade").with_permit(gpu);
//! let pipeline = pipeline.lock()?;
//!
//! let mut results: Vec<u64> = pipeline
//!     .process(0..100)?
//!     .into_iter()
//!     .filter_map(Carry::into_single)
//!     .collect();
//! results.sort_unstable();
//! assert_eq!(results[0], 1);
//! assert_eq!(results.len(), 100);
//! # Ok::<(), stagehand::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod flow;
pub mod observability;
pub mod permit;
pub mod pipeline;
pub mod pool;
pub mod stage;
pub mod store;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::flow::Flow;
    pub use crate::permit::ResourcePermit;
    pub use crate::pipeline::{Building, ExecutionMode, Locked, Pipeline, PipelineConfig};
    pub use crate::stage::{Carry, Stage};
}

pub use error::{Error, Result};
