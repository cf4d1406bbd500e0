//! Dispatch and drain benchmarks
//!
//! - Reducer execution in isolation
//! - Store dispatch throughput, with and without listeners
//! - Spawn-and-drain cost of a watched trigger
//!
//! Run with: `cargo bench`

#![allow(missing_docs)] // Benchmarks don't need extensive docs
#![allow(clippy::expect_used)] // Benchmarks can use expect for setup
#![allow(dead_code)] // Benchmark data structures may have unused fields

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use saga_core::action::Action;
use saga_core::effect::Effect;
use saga_core::reducer::Reducer;
use saga_core::watch::WatchTable;
use saga_runtime::{Store, StoreConfig};
use saga_testing::ImmediateClock;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug)]
struct BenchState {
    counter: i64,
    data: Vec<u8>, // For testing state size impact
}

impl Default for BenchState {
    fn default() -> Self {
        Self {
            counter: 0,
            data: vec![0; 1024], // 1KB of data
        }
    }
}

#[derive(Clone, Debug)]
enum BenchAction {
    Increment,
    SetValue(i64),
    IncrementLater,
    End,
}

impl Action for BenchAction {
    fn end() -> Self {
        Self::End
    }

    fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Increment => "Increment",
            Self::SetValue(_) => "SetValue",
            Self::IncrementLater => "IncrementLater",
            Self::End => "End",
        }
    }
}

struct BenchReducer;

impl Reducer for BenchReducer {
    type State = BenchState;
    type Action = BenchAction;

    fn reduce(&self, mut state: BenchState, action: &BenchAction) -> BenchState {
        match action {
            BenchAction::Increment => state.counter += 1,
            BenchAction::SetValue(v) => state.counter = *v,
            BenchAction::IncrementLater | BenchAction::End => {},
        }
        state
    }
}

fn watches() -> WatchTable<BenchAction, ()> {
    WatchTable::<BenchAction, ()>::new().take_every("increment_later", |action, _env| {
        matches!(action, BenchAction::IncrementLater).then(|| Effect::Delay {
            duration: Duration::from_millis(1),
            action: Box::new(BenchAction::Increment),
        })
    })
}

fn bench_store() -> Store<BenchState, BenchAction, (), BenchReducer> {
    Store::with_config(
        BenchState::default(),
        BenchReducer,
        watches(),
        (),
        StoreConfig::default().with_clock(Arc::new(ImmediateClock)),
    )
}

/// Benchmark reducer execution in isolation (no Store overhead)
fn benchmark_reducer_execution(c: &mut Criterion) {
    let mut group = c.benchmark_group("reducer");
    group.throughput(Throughput::Elements(1));

    let reducer = BenchReducer;

    group.bench_function("increment", |b| {
        b.iter_batched(
            BenchState::default,
            |state| reducer.reduce(state, black_box(&BenchAction::Increment)),
            BatchSize::SmallInput,
        );
    });

    group.bench_function("set_value", |b| {
        b.iter_batched(
            BenchState::default,
            |state| reducer.reduce(state, black_box(&BenchAction::SetValue(42))),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Benchmark Store throughput (actions/sec)
fn benchmark_dispatch_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    group.bench_function("dispatch_action", |b| {
        let store = bench_store();
        b.iter(|| store.dispatch(black_box(BenchAction::Increment)));
    });

    group.bench_function("dispatch_and_read_state", |b| {
        let store = bench_store();
        b.iter(|| {
            store.dispatch(black_box(BenchAction::Increment));
            store.state(|s| s.counter)
        });
    });

    group.bench_function("dispatch_with_listeners", |b| {
        let store = bench_store();
        for _ in 0..4 {
            store.subscribe(|state, _action| {
                black_box(state.counter);
            });
        }
        b.iter(|| store.dispatch(black_box(BenchAction::Increment)));
    });

    group.finish();
}

/// Benchmark spawning a watched effect and draining the store
fn benchmark_spawn_and_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("drain");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime");

    for triggers in [1_u64, 16, 128] {
        group.throughput(Throughput::Elements(triggers));
        group.bench_function(format!("spawn_{triggers}_and_drain"), |b| {
            b.to_async(&runtime).iter(|| async {
                let store = bench_store();
                for _ in 0..triggers {
                    store.dispatch(BenchAction::IncrementLater);
                }
                store
                    .run_to_completion(|s| s.counter)
                    .await
                    .expect("drain should succeed")
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_reducer_execution,
    benchmark_dispatch_throughput,
    benchmark_spawn_and_drain
);
criterion_main!(benches);
