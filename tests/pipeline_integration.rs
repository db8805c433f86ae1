//! Integration tests for the Stagehand pipeline system.

use stagehand::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing_subscriber::layer::{Context, SubscriberExt};

fn inc() -> Stage<i64> {
    Stage::map(|x: i64| x + 1).named("inc")
}

fn identity() -> Stage<i64> {
    Stage::map(|x: i64| x).named("identity")
}

fn singles(results: Vec<Carry<i64>>) -> Vec<i64> {
    results.into_iter().filter_map(Carry::into_single).collect()
}

/// A single incrementing stage.
#[test]
fn test_push_single_increment() {
    let pipeline = Pipeline::new().then(inc()).lock().unwrap();
    assert_eq!(pipeline.push(0_i64).unwrap(), Carry::Single(1));
}

/// Three incrementing stages in a row.
#[test]
fn test_push_three_increments() {
    let pipeline = (inc() >> inc() >> inc()).lock().unwrap();
    assert_eq!(pipeline.push(0_i64).unwrap(), Carry::Single(3));
}

/// A generator first stage drives processing without explicit items.
#[test]
fn test_generator_driven_process() {
    let pipeline = (Stage::generator(|| 0..10_i64) >> identity() >> identity())
        .lock()
        .unwrap();

    let results = singles(pipeline.process_generated().unwrap());
    assert_eq!(results, (0..10).collect::<Vec<_>>());
}

/// Generated items run from the second stage through the worker pool.
#[test]
fn test_generator_driven_process_parallel() {
    let starts = Arc::new(AtomicUsize::new(0));
    let calls = Arc::new(AtomicUsize::new(0));
    let generator_starts = Arc::clone(&starts);
    let map_calls = Arc::clone(&calls);

    let stages = vec![
        Stage::generator(move || {
            generator_starts.fetch_add(1, Ordering::SeqCst);
            0..100_i64
        }),
        Stage::map(move |x: i64| {
            map_calls.fetch_add(1, Ordering::SeqCst);
            x * 2
        }),
    ];
    let parallel = Pipeline::from_stages(stages.clone(), PipelineConfig::parallel(4))
        .lock()
        .unwrap();
    let sequential = Pipeline::from_stages(stages, PipelineConfig::default())
        .lock()
        .unwrap();

    let mut results = singles(parallel.process_generated().unwrap());
    results.sort_unstable();
    assert_eq!(results, (0..100).map(|x| x * 2).collect::<Vec<_>>());
    assert_eq!(starts.load(Ordering::SeqCst), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 100);

    let expected = singles(sequential.process_generated().unwrap());
    assert_eq!(results, expected);
}

/// A producer ignores the carried value, so a nested identity pipeline sees
/// `1` for every item.
#[test]
fn test_nested_pipeline_with_producer() {
    let inner = Pipeline::new().then(identity()).lock().unwrap();
    let outer = (Stage::produce(|| 1_i64).named("one") >> inner >> inc())
        .lock()
        .unwrap();

    let results = singles(outer.process(0..10).unwrap());
    assert!(results.iter().all(|&x| x == 2));
    assert_eq!(results.iter().sum::<i64>(), 20);
}

/// Parallel processing over many items returns every result once.
#[test]
fn test_parallel_identity_thousand_items() {
    let pipeline = Pipeline::with_config(PipelineConfig::parallel(6))
        .then(identity())
        .lock()
        .unwrap();

    let mut results = singles(pipeline.process(0..1000).unwrap());
    results.sort_unstable();
    assert_eq!(results, (0..1000).collect::<Vec<_>>());
}

/// Holding without a key is rejected when the stage is built.
#[test]
fn test_hold_without_key() {
    let err = inc().holding("").unwrap_err();
    assert!(matches!(err, Error::InvalidHold { .. }));
}

#[test]
fn test_sequential_preserves_input_order() {
    let pipeline = (Stage::map(|x: i64| x * 3) >> Stage::map(|x: i64| x - 1))
        .lock()
        .unwrap();
    let items: Vec<i64> = vec![9, 2, 7, 4, 4, 0, -3];

    let results = singles(pipeline.process(items.clone()).unwrap());
    let expected: Vec<i64> = items.iter().map(|x| x * 3 - 1).collect();
    assert_eq!(results, expected);
}

#[test]
fn test_parallel_matches_sequential() {
    let stages = || [Stage::map(|x: i64| x * x), inc()];

    let sequential = Pipeline::from_stages(stages(), PipelineConfig::default())
        .lock()
        .unwrap();
    let parallel = Pipeline::from_stages(stages(), PipelineConfig::parallel(4))
        .lock()
        .unwrap();

    let mut expected = singles(sequential.process(0..200).unwrap());
    let mut actual = singles(parallel.process(0..200).unwrap());
    expected.sort_unstable();
    actual.sort_unstable();
    assert_eq!(actual, expected);
}

#[test]
fn test_parallel_failure_does_not_cancel_siblings() {
    let finished = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&finished);
    let pipeline = Pipeline::with_config(PipelineConfig::parallel(4))
        .then(Stage::try_map(move |x: i64| {
            counter.fetch_add(1, Ordering::SeqCst);
            if x == 0 { Err("zero") } else { Ok(x) }
        }))
        .lock()
        .unwrap();

    let err = pipeline.process(0..50).unwrap_err();
    assert_eq!(err.to_string(), "zero");
    assert_eq!(finished.load(Ordering::SeqCst), 50);
}

#[test]
fn test_parallel_reference_rejected_regardless_of_position() {
    for position in 0..3 {
        let mut pipeline = Pipeline::with_config(PipelineConfig::parallel(2))
            .then(inc())
            .then(inc());
        pipeline.insert(
            position,
            Stage::with_references(["k"], |value: Carry<i64>, _| Ok(value)),
        );
        assert!(matches!(
            pipeline.lock().unwrap_err(),
            Error::ParallelReference { .. }
        ));
    }
}

#[test]
fn test_parallel_allows_holds() {
    let pipeline = Pipeline::with_config(PipelineConfig::parallel(3))
        .then(inc().holding("last").unwrap())
        .lock()
        .unwrap();

    pipeline.process(0..30).unwrap();
    assert!(pipeline.store().contains("last"));
}

#[test]
fn test_tuple_through_shapes() {
    let pipeline = (Stage::value(|x: i64| Ok(Carry::tuple([x, x + 1, x + 2])))
        >> Stage::whole(|carry: Carry<i64>| Ok(Carry::Single(carry.into_vec().len() as i64)))
        >> Stage::value(|n: i64| Ok(Carry::tuple([n, 10])))
        >> Stage::spread(|xs: Vec<i64>| Ok(Carry::Single(xs.iter().product()))))
    .lock()
    .unwrap();

    assert_eq!(pipeline.push(5_i64).unwrap(), Carry::Single(30));
}

#[test]
fn test_held_value_across_stages() {
    let pipeline = (Stage::map(|x: i64| x * 2).holding("doubled").unwrap()
        >> Stage::map(|x: i64| x + 100)
        >> Stage::with_references(["doubled"], |value: Carry<i64>, held: Vec<Carry<i64>>| {
            let mut items = value.into_vec();
            items.extend(held.into_iter().flat_map(Carry::into_vec));
            Ok(Carry::Tuple(items))
        }))
    .lock()
    .unwrap();

    assert_eq!(pipeline.push(4_i64).unwrap(), Carry::tuple([108, 8]));
    assert_eq!(pipeline.retrieve("doubled").unwrap(), Carry::Single(8));
}

#[test]
fn test_caller_provided_hold() {
    let pipeline = Pipeline::new()
        .then(Stage::with_references(["offset"], |value: Carry<i64>, held: Vec<Carry<i64>>| {
            let x = value.into_single().unwrap_or_default();
            let offset = held[0].as_single().copied().unwrap_or_default();
            Ok(Carry::Single(x + offset))
        }))
        .lock()
        .unwrap();

    assert!(matches!(
        pipeline.push(1_i64).unwrap_err(),
        Error::MissingHeld(ref key) if key == "offset"
    ));
    pipeline.hold("offset", 41_i64);
    assert_eq!(pipeline.push(1_i64).unwrap(), Carry::Single(42));
}

#[test]
fn test_void_stage_then_referencing_stage() {
    let pipeline = (Stage::<i64>::producer(|| Ok(Carry::Empty))
        >> Stage::with_references(["never"], |value: Carry<i64>, held: Vec<Carry<i64>>| {
            assert!(value.is_empty());
            assert!(held.is_empty());
            Ok(Carry::Single(0))
        }))
    .lock()
    .unwrap();

    assert_eq!(pipeline.push(Carry::Empty).unwrap(), Carry::Single(0));
}

#[test]
fn test_fan_out_through_parallel_inner() {
    let inner = Pipeline::with_config(PipelineConfig::parallel(3).with_name("inner"))
        .then(Stage::map(|x: i64| x * 10))
        .lock()
        .unwrap();
    let outer = Pipeline::with_config(PipelineConfig::parallel(2).with_name("outer"))
        .then(Stage::value(|x: i64| Ok(Carry::tuple(0..x))))
        .then(Stage::fan_out(inner))
        .then(Stage::spread(|xs: Vec<i64>| Ok(Carry::Single(xs.iter().sum()))))
        .lock()
        .unwrap();

    let mut results = singles(outer.process(1..=4).unwrap());
    results.sort_unstable();
    // sum(0..n) * 10 for n in 1..=4
    assert_eq!(results, vec![0, 10, 30, 60]);
}

#[test]
fn test_nested_error_propagates_unwrapped() {
    let inner = Pipeline::new()
        .then(Stage::try_map(|_: i64| Err::<i64, _>("inner failed")))
        .lock()
        .unwrap();
    let outer = (inc() >> inner).lock().unwrap();

    let err = outer.push(1_i64).unwrap_err();
    assert_eq!(err.to_string(), "inner failed");
    assert!(err.as_action().is_some());
}

/// Counts ERROR-level events.
#[derive(Clone, Default)]
struct ErrorCount(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for ErrorCount {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[test]
fn test_unlock_then_relock() {
    let errors = ErrorCount::default();
    let subscriber = tracing_subscriber::registry().with(errors.clone());

    tracing::subscriber::with_default(subscriber, || {
        let pipeline = (inc() >> inc()).lock().unwrap();
        assert_eq!(pipeline.push(0_i64).unwrap(), Carry::Single(2));
        assert_eq!(errors.0.load(Ordering::SeqCst), 0);

        let mut pipeline = pipeline.unlock();
        assert_eq!(errors.0.load(Ordering::SeqCst), 1);

        pipeline.add(inc());
        let pipeline = pipeline.lock().unwrap().lock();
        assert_eq!(pipeline.push(0_i64).unwrap(), Carry::Single(3));
    });

    assert_eq!(errors.0.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cloned_pipeline_runs_independently() {
    let original = Pipeline::new()
        .then(inc().holding("seen").unwrap())
        .lock()
        .unwrap();
    let copy = original.clone();

    original.push(10_i64).unwrap();
    copy.push(20_i64).unwrap();

    assert_eq!(original.retrieve("seen").unwrap(), Carry::Single(11));
    assert_eq!(copy.retrieve("seen").unwrap(), Carry::Single(21));
}
