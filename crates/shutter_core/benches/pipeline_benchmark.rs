//! # Pipeline Benchmark
//!
//! Measures the per-frame cost of the produce → complete → consume cycle,
//! which runs once per vsync on the hot path.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use shutter_core::{CountingGate, Pipeline};

fn bench_produce_consume(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_cycle");

    for depth in [1usize, 2, 3] {
        let pipeline = Pipeline::<u64>::new(depth);
        group.bench_with_input(BenchmarkId::new("produce_complete_consume", depth), &depth, |b, _| {
            let mut frame = 0u64;
            b.iter(|| {
                if let Some(continuation) = pipeline.produce() {
                    continuation.complete(frame);
                }
                frame = frame.wrapping_add(1);
                pipeline.consume(|payload| {
                    black_box(payload);
                });
            });
        });
    }

    group.finish();
}

fn bench_full_pipeline_rejection(c: &mut Criterion) {
    let pipeline = Pipeline::<u64>::new(2);
    let _a = pipeline.produce();
    let _b = pipeline.produce();

    c.bench_function("pipeline_produce_when_full", |b| {
        b.iter(|| black_box(pipeline.produce().is_none()));
    });
}

fn bench_gate(c: &mut Criterion) {
    let gate = CountingGate::new(1);
    c.bench_function("gate_acquire_release", |b| {
        b.iter(|| {
            if gate.try_acquire() {
                gate.release();
            }
        });
    });
}

criterion_group!(benches, bench_produce_consume, bench_full_pipeline_rejection, bench_gate);
criterion_main!(benches);
