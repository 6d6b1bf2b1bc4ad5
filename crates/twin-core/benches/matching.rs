//! Match engine benchmarks.
//!
//! Run with: cargo bench -p twin-core

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use twin_core::{MatchEngine, Record, Timestamp};

const DELAY: Duration = Duration::from_secs(5);

/// Engine holding `depth` unrelated records, all inserted at t=0.
fn create_engine(depth: usize) -> MatchEngine {
    let mut engine = MatchEngine::with_delay(DELAY);
    for i in 0..depth {
        engine.process(Record::new(format!("p{i}"), format!("l{i}")), Timestamp::ZERO);
    }
    engine
}

/// Benchmark buffering into an empty engine.
fn bench_buffer_empty(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_empty");
    group.throughput(Throughput::Elements(1));

    group.bench_function("no_match", |b| {
        b.iter_batched(
            || (create_engine(0), Record::new("p", "l")),
            |(mut engine, record)| black_box(engine.process(record, Timestamp::ZERO)),
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

/// Benchmark a miss against buffers of increasing depth (full scan).
fn bench_miss_deep_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("miss_deep_buffer");
    group.throughput(Throughput::Elements(1));

    for depth in [100, 1000, 10000] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter_batched(
                || create_engine(depth),
                |mut engine| black_box(engine.process(Record::new("none", "none"), Timestamp::ZERO)),
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

/// Benchmark a full match on the oldest entry (early exit on score 2).
fn bench_match_oldest(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_oldest");
    group.throughput(Throughput::Elements(1));

    for depth in [100, 1000, 10000] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter_batched(
                || create_engine(depth),
                |mut engine| black_box(engine.process(Record::new("p0", "l0"), Timestamp::ZERO)),
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

/// Benchmark purging a fully expired buffer.
fn bench_expire_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("expire_all");
    group.throughput(Throughput::Elements(1));

    group.bench_function("10k_entries", |b| {
        b.iter_batched(
            || create_engine(10000),
            |mut engine| black_box(engine.remove_expired(Timestamp::from_secs(10))),
            criterion::BatchSize::LargeInput,
        )
    });

    group.finish();
}

/// Benchmark a stream where every third login repeats.
fn bench_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput");
    group.throughput(Throughput::Elements(10000));

    group.bench_function("mixed_stream", |b| {
        b.iter_batched(
            || MatchEngine::with_delay(DELAY),
            |mut engine| {
                for i in 0..10000u64 {
                    let login = if i % 3 == 0 { "shared" } else { "solo" };
                    let record = Record::new(format!("p{i}"), login);
                    black_box(engine.process(record, Timestamp::from_millis(i)));
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_buffer_empty,
    bench_miss_deep_buffer,
    bench_match_oldest,
    bench_expire_all,
    bench_throughput,
);

criterion_main!(benches);
