//! Window evaluation benchmarks.
//!
//! Compares the two window evaluation strategies over growing
//! partitions:
//! - Segment-tree indexed evaluation (associative aggregates)
//! - Direct per-frame folding (general aggregates)

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use quern_core::Value;
use quern_engine::aggregate::{sum, Aggregate, AggregateExpr};
use quern_engine::expr::{col, SortKey};
use quern_engine::relation::collect;
use quern_engine::relations::{RelationExt, Values};
use quern_engine::window::{Frame, FrameBound, WindowDef};

// ============================================================================
// Helper: Simple RNG for reproducible benchmarks
// ============================================================================

struct Rng {
    state: u64,
}

impl Rng {
    const fn new(seed: u64) -> Self {
        Self { state: if seed == 0 { 0x853c_49e6_748f_ea9b } else { seed } }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_i64_range(&mut self, max: i64) -> i64 {
        (self.next_u64() % max as u64) as i64
    }
}

/// Sum that only ever folds, to force direct evaluation.
#[derive(Default)]
struct FoldSum {
    total: i64,
}

impl Aggregate for FoldSum {
    fn step(&mut self, input: &Value) {
        if let Value::Int(i) = input {
            self.total += i;
        }
    }

    fn finalize(&self) -> Value {
        Value::Int(self.total)
    }
}

fn rows(n: usize) -> Vec<Vec<Value>> {
    let mut rng = Rng::new(42);
    (0..n)
        .map(|i| vec![Value::Int(i as i64), Value::Int(rng.next_i64_range(1000))])
        .collect()
}

fn input(n: usize) -> Values {
    Values::with_columns(vec!["t", "v"], rows(n)).expect("valid bench input")
}

fn wide_frame_def() -> WindowDef {
    // A frame spanning a quarter of the partition either side, where
    // direct folding degenerates to O(n) per row.
    WindowDef::new().order_by(vec![SortKey::asc(col("t"))]).frame(
        Frame::rows(FrameBound::Preceding(256), FrameBound::Following(256))
            .expect("valid frame"),
    )
}

// ============================================================================
// Indexed vs. Direct-Fold Evaluation
// ============================================================================

fn window_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_sum");

    for n in [256_usize, 1024, 4096] {
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("segment_tree", n), &n, |b, &n| {
            b.iter(|| {
                let rel = input(n)
                    .window(wide_frame_def(), vec![("s", sum(col("v")))])
                    .expect("valid window");
                black_box(collect(rel).expect("window evaluation"))
            });
        });

        group.bench_with_input(BenchmarkId::new("direct_fold", n), &n, |b, &n| {
            b.iter(|| {
                let rel = input(n)
                    .window(
                        wide_frame_def(),
                        vec![("s", AggregateExpr::general(FoldSum::default, col("v")))],
                    )
                    .expect("valid window");
                black_box(collect(rel).expect("window evaluation"))
            });
        });
    }

    group.finish();
}

// ============================================================================
// Running Sum Over Partitions
// ============================================================================

fn partitioned_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_partitioned");

    for n in [1024_usize, 4096] {
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("running_sum", n), &n, |b, &n| {
            b.iter(|| {
                let mut rng = Rng::new(7);
                let data: Vec<Vec<Value>> = (0..n)
                    .map(|i| {
                        vec![
                            Value::Int(rng.next_i64_range(16)),
                            Value::Int(i as i64),
                            Value::Int(rng.next_i64_range(1000)),
                        ]
                    })
                    .collect();
                let rel = Values::with_columns(vec!["k", "t", "v"], data)
                    .expect("valid bench input")
                    .window(
                        WindowDef::new()
                            .partition_by(vec![col("k")])
                            .order_by(vec![SortKey::asc(col("t"))]),
                        vec![("running", sum(col("v")))],
                    )
                    .expect("valid window");
                black_box(collect(rel).expect("window evaluation"))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, window_benchmarks, partitioned_benchmarks);
criterion_main!(benches);
