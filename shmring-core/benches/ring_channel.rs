// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Ring channel microbenchmarks.
//!
//! Measures lock + copy cost of the shared memory ring at various payload
//! sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shmring_core::{AccessMode, RingChannel};
use std::time::Duration;

/// Payload sizes to benchmark (in bytes).
const PAYLOAD_SIZES: &[usize] = &[64, 256, 1024, 4096, 16384, 65536];

/// Ring size used by every benchmark.
const RING_SIZE: usize = 1024 * 1024;

fn ring(tag: &str, size: usize) -> RingChannel {
    let name = format!("bench-{}-{}-{}", tag, size, std::process::id());
    let mut ring = RingChannel::new().with_unlink_on_close(true);
    ring.create(&name, RING_SIZE, false)
        .expect("Failed to create ring");
    ring.map(AccessMode::ReadWrite, 0).expect("Failed to map ring");
    ring
}

/// Write + read under one lock acquisition.
fn bench_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_roundtrip");
    group.measurement_time(Duration::from_secs(5));

    for &size in PAYLOAD_SIZES {
        group.throughput(Throughput::Bytes(size as u64 * 2)); // Write + read

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let ring = ring("rt", size);
            let payload = vec![0xABu8; size];
            let mut buf = vec![0u8; size];

            b.iter(|| {
                let guard = ring.lock().expect("lock failed");
                guard.write(black_box(&payload)).expect("Write failed");
                black_box(guard.read(&mut buf).expect("Read failed"));
            });
        });
    }

    group.finish();
}

/// Cost of an uncontended lock/unlock pair.
fn bench_lock(c: &mut Criterion) {
    let ring = ring("lock", 0);

    c.bench_function("ring_lock_unlock", |b| {
        b.iter(|| {
            let guard = ring.lock().expect("lock failed");
            black_box(guard.is_abandoned());
        });
    });

    c.bench_function("ring_try_lock", |b| {
        b.iter(|| {
            black_box(ring.try_lock().expect("try_lock failed").is_some());
        });
    });
}

criterion_group!(benches, bench_roundtrip, bench_lock);
criterion_main!(benches);
