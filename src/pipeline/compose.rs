//! `>>` and `>>=` for building pipelines.
//!
//! | Left | Right | Result |
//! |------|-------|--------|
//! | `Stage` | `Stage` | two-stage pipeline |
//! | `Stage` | building pipeline | the stage inserted at the front |
//! | `Stage` | locked pipeline | two-stage pipeline, the right one nested |
//! | building pipeline | `Stage` | the stage appended |
//! | building pipeline | building pipeline | right stages appended to the left |
//! | building pipeline | locked pipeline | the right one appended as a nested stage |
//!
//! Any other combination does not compile.

use super::{Building, Locked, Pipeline, PipelineConfig};
use crate::stage::Stage;
use std::ops::{Shr, ShrAssign};

impl<T: Clone + Send + Sync + 'static> Shr<Stage<T>> for Stage<T> {
    type Output = Pipeline<T, Building>;

    fn shr(self, next: Stage<T>) -> Self::Output {
        Pipeline::from_stages([self, next], PipelineConfig::default())
    }
}

impl<T: Clone + Send + Sync + 'static> Shr<Pipeline<T, Building>> for Stage<T> {
    type Output = Pipeline<T, Building>;

    fn shr(self, mut pipeline: Pipeline<T, Building>) -> Self::Output {
        pipeline.insert(0, self);
        pipeline
    }
}

impl<T: Clone + Send + Sync + 'static> Shr<Pipeline<T, Locked>> for Stage<T> {
    type Output = Pipeline<T, Building>;

    fn shr(self, inner: Pipeline<T, Locked>) -> Self::Output {
        Pipeline::from_stages([self, Stage::nested(inner)], PipelineConfig::default())
    }
}

impl<T: Clone + Send + Sync + 'static> Shr<Stage<T>> for Pipeline<T, Building> {
    type Output = Pipeline<T, Building>;

    fn shr(self, stage: Stage<T>) -> Self::Output {
        self.then(stage)
    }
}

impl<T: Clone + Send + Sync + 'static> Shr<Pipeline<T, Building>> for Pipeline<T, Building> {
    type Output = Pipeline<T, Building>;

    fn shr(mut self, other: Pipeline<T, Building>) -> Self::Output {
        self.merge(other);
        self
    }
}

impl<T: Clone + Send + Sync + 'static> Shr<Pipeline<T, Locked>> for Pipeline<T, Building> {
    type Output = Pipeline<T, Building>;

    fn shr(mut self, inner: Pipeline<T, Locked>) -> Self::Output {
        self.nest(inner);
        self
    }
}

impl<T: Clone + Send + Sync + 'static> ShrAssign<Stage<T>> for Pipeline<T, Building> {
    fn shr_assign(&mut self, stage: Stage<T>) {
        self.add(stage);
    }
}

impl<T: Clone + Send + Sync + 'static> ShrAssign<Pipeline<T, Building>> for Pipeline<T, Building> {
    fn shr_assign(&mut self, other: Pipeline<T, Building>) {
        self.merge(other);
    }
}

impl<T: Clone + Send + Sync + 'static> ShrAssign<Pipeline<T, Locked>> for Pipeline<T, Building> {
    fn shr_assign(&mut self, inner: Pipeline<T, Locked>) {
        self.nest(inner);
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    fn id() -> Stage<i64> {
        Stage::map(|x: i64| x).named("id")
    }

    fn names(pipeline: &Pipeline<i64>) -> Vec<&str> {
        pipeline.stages().iter().map(|s| s.name()).collect()
    }

    #[test]
    fn test_stage_then_stage() {
        let pipeline = Stage::map(|x: i64| x).named("a") >> id();
        assert_eq!(names(&pipeline), ["a", "id"]);
    }

    #[test]
    fn test_stage_prepends_to_pipeline() {
        let pipeline = Stage::map(|x: i64| x).named("front") >> (id() >> id());
        assert_eq!(names(&pipeline), ["front", "id", "id"]);
    }

    #[test]
    fn test_pipeline_merge_counts() {
        let left = id() >> id();
        let right = id() >> id() >> id();
        let merged = left >> right;
        assert_eq!(merged.len(), 5);
    }

    #[test]
    fn test_nesting_locked_pipeline() {
        let inner = (id() >> id()).lock().unwrap();
        let outer = Stage::produce(|| 1_i64).named("one") >> inner >> Stage::map(|x: i64| x + 1);
        assert_eq!(outer.len(), 3);
        assert_eq!(outer.stages()[1].shape().label(), "nested");
    }

    #[test]
    fn test_shr_assign() {
        let mut pipeline = Pipeline::new();
        pipeline >>= id();
        pipeline >>= id() >> id();
        pipeline >>= (id() >> id()).lock().unwrap();
        assert_eq!(pipeline.len(), 4);
    }
}
