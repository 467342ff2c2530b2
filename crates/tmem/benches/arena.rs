// Arena benchmarks
//
// These benchmarks measure the bump allocation fast path, the cost of
// rewinding and the reserve/reuse cycle that the hysteresis window is meant
// to keep cheap.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tmem::{Arena, Location};

/// Benchmark sequential allocations of different sizes.
///
/// The arena is rewound whenever it fills up so that growth never enters the
/// measurement.
fn bench_sequential_allocations(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential_alloc");

    for size in &[4, 16, 64, 256, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut arena = Arena::new();
            arena.reserve(1 << 20).unwrap();
            b.iter(|| {
                if arena.remaining_bytes() < size + 8 {
                    arena.restore_location(Location::ROOT).unwrap();
                }
                black_box(arena.allocate(black_box(size)).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark scratch use: allocate a burst, then rewind to a mark.
fn bench_scoped_scratch(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoped_scratch");

    group.bench_function("location_restore", |b| {
        let mut arena = Arena::new();
        arena.reserve(64 * 1024).unwrap();
        b.iter(|| {
            let mark = arena.location();
            for size in [8, 24, 100, 7] {
                black_box(arena.allocate(size).unwrap());
            }
            arena.restore_location(mark).unwrap();
        });
    });

    group.bench_function("scope_guard", |b| {
        let mut arena = Arena::new();
        arena.reserve(64 * 1024).unwrap();
        b.iter(|| {
            let mut scope = arena.scope();
            for size in [8, 24, 100, 7] {
                black_box(scope.allocate(size).unwrap());
            }
        });
    });

    group.finish();
}

/// Benchmark per-cycle `reserve` with a fluctuating size estimate.
///
/// Requests inside the reuse window keep the buffer; the `outside_window`
/// case reallocates every time for comparison.
fn bench_reserve_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("reserve_cycle");

    group.bench_function("inside_window", |b| {
        let mut arena = Arena::new();
        arena.reserve(100_000).unwrap();
        let estimates = [100_000, 92_000, 97_500, 80_000];
        let mut i = 0;
        b.iter(|| {
            arena.reserve(black_box(estimates[i % estimates.len()])).unwrap();
            i += 1;
        });
    });

    group.bench_function("outside_window", |b| {
        let mut arena = Arena::new();
        let estimates = [100_000, 40_000];
        let mut i = 0;
        b.iter(|| {
            arena.reserve(black_box(estimates[i % estimates.len()])).unwrap();
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark growth from a small buffer.
fn bench_growth(c: &mut Criterion) {
    let mut group = c.benchmark_group("growth");
    group.sample_size(100);

    group.bench_function("from_64_bytes", |b| {
        b.iter(|| {
            let mut arena = Arena::new();
            arena.reserve(64).unwrap();
            for _ in 0..100 {
                black_box(arena.allocate(black_box(64)).unwrap());
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_sequential_allocations,
    bench_scoped_scratch,
    bench_reserve_cycle,
    bench_growth,
);
criterion_main!(benches);
