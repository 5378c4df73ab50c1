// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Benchmarks for the timestamp oracles.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use strontium_bundle::time::{HlcOracle, LogicalOracle, Timestamp, TimestampOracle};

fn bench_hlc_next_commit(c: &mut Criterion) {
    let hlc = HlcOracle::new();

    c.bench_function("HlcOracle::next_commit", |b| {
        b.iter(|| black_box(hlc.next_commit()))
    });
}

fn bench_logical_next_commit(c: &mut Criterion) {
    let oracle = LogicalOracle::new();

    c.bench_function("LogicalOracle::next_commit", |b| {
        b.iter(|| black_box(oracle.next_commit()))
    });
}

fn bench_read_timestamp(c: &mut Criterion) {
    let hlc = HlcOracle::new();

    c.bench_function("HlcOracle::read_timestamp", |b| {
        b.iter(|| black_box(hlc.read_timestamp()))
    });
}

fn bench_timestamp_operations(c: &mut Criterion) {
    let t1 = Timestamp::new(1_000_000_000);
    let t2 = Timestamp::new(1_000_000_200);

    c.bench_function("Timestamp::cmp", |b| b.iter(|| black_box(t1 < t2)));

    c.bench_function("Timestamp::is_commit", |b| {
        b.iter(|| black_box(t1.is_commit()))
    });
}

criterion_group!(
    benches,
    bench_hlc_next_commit,
    bench_logical_next_commit,
    bench_read_timestamp,
    bench_timestamp_operations
);
criterion_main!(benches);
