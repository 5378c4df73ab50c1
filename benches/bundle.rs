// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Benchmarks for bundle publish and read paths.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use crossbeam_epoch as epoch;
use strontium_bundle::bundle::Bundle;
use strontium_bundle::time::Timestamp;

fn populated_bundle(versions: u64) -> Bundle<u64> {
    let bundle = Bundle::new();
    for i in 1..=versions {
        bundle.prepare(i);
        bundle.finalize(Timestamp::new(i * 10));
    }
    bundle
}

fn bench_prepare_finalize(c: &mut Criterion) {
    let bundle = Bundle::new();
    let counter = AtomicU64::new(0);

    let mut group = c.benchmark_group("bundle");
    group.throughput(Throughput::Elements(1));

    group.bench_function("prepare_finalize", |b| {
        b.iter(|| {
            let i = counter.fetch_add(1, Ordering::Relaxed) + 1;
            bundle.prepare(i);
            bundle.finalize(Timestamp::new(i));
        })
    });

    group.finish();
}

fn bench_read_latest(c: &mut Criterion) {
    let bundle = populated_bundle(1000);

    let mut group = c.benchmark_group("bundle");
    group.throughput(Throughput::Elements(1));

    group.bench_function("read_latest", |b| {
        b.iter(|| {
            let guard = &epoch::pin();
            black_box(bundle.get_ptr_by_timestamp(Timestamp::MAX, guard).copied())
        })
    });

    group.finish();
}

fn bench_read_depth(c: &mut Criterion) {
    let bundle = populated_bundle(1000);

    let mut group = c.benchmark_group("bundle");

    for depth in [1u64, 10, 100, 1000] {
        let at = Timestamp::new((1000 - depth + 1) * 10);
        group.bench_function(format!("read_depth_{}", depth), |b| {
            b.iter(|| {
                let guard = &epoch::pin();
                black_box(bundle.get_ptr_by_timestamp(at, guard).copied())
            })
        });
    }

    group.finish();
}

fn bench_read_under_write_load(c: &mut Criterion) {
    let bundle = Arc::new(populated_bundle(100));
    let stop = Arc::new(AtomicU64::new(0));

    let writer = {
        let bundle = Arc::clone(&bundle);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut i = 100u64;
            while stop.load(Ordering::Relaxed) == 0 {
                i += 1;
                bundle.prepare(i);
                bundle.finalize(Timestamp::new(i * 10));
            }
        })
    };

    let mut group = c.benchmark_group("bundle");
    group.throughput(Throughput::Elements(1));

    group.bench_function("read_under_write_load", |b| {
        b.iter_batched(
            || Timestamp::new(rand::random::<u64>() % 1000 + 10),
            |at| {
                let guard = &epoch::pin();
                black_box(bundle.get_ptr_by_timestamp(at, guard).copied())
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();

    stop.store(1, Ordering::Relaxed);
    writer.join().unwrap();
}

fn bench_gc(c: &mut Criterion) {
    let mut group = c.benchmark_group("bundle");
    group.throughput(Throughput::Elements(1000));

    group.bench_function("gc_1000", |b| {
        b.iter_batched_ref(
            || populated_bundle(1001),
            |bundle| {
                let guard = &epoch::pin();
                black_box(bundle.gc(Timestamp::new(10_010), guard));
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_prepare_finalize,
    bench_read_latest,
    bench_read_depth,
    bench_read_under_write_load,
    bench_gc,
);
criterion_main!(benches);
