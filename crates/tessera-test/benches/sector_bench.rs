//! Benchmarks for sector set arithmetic

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tessera_sectors::SectorSet;

fn striped(offset: usize, count: usize) -> SectorSet {
    SectorSet::from_ranges((0..count).map(|i| (offset + i * 4, offset + i * 4 + 2)))
}

fn bench_add_coalescing(c: &mut Criterion) {
    let base = striped(0, 256);

    c.bench_function("sector_add_coalescing", |b| {
        b.iter(|| {
            let mut set = base.clone();
            // bridges every gap in one pass
            set.add(black_box(1..1023));
            black_box(set)
        })
    });
}

fn bench_sub_splitting(c: &mut Criterion) {
    let mut base = SectorSet::new();
    base.add(0..1024);

    c.bench_function("sector_sub_splitting", |b| {
        b.iter(|| {
            let mut set = base.clone();
            for i in 0..256 {
                set.sub(black_box(i * 4..i * 4 + 2));
            }
            black_box(set)
        })
    });
}

fn bench_contains_range(c: &mut Criterion) {
    let set = striped(0, 256);

    c.bench_function("sector_contains_range", |b| {
        b.iter(|| black_box(set.contains_range(black_box(512..514))))
    });
}

fn bench_joined_walk(c: &mut Criterion) {
    let left = striped(0, 256);
    let right = striped(2, 256);

    c.bench_function("sector_joined_walk", |b| {
        b.iter(|| {
            black_box(
                left.iter_joined_sectors(black_box(&right), 2048)
                    .count(),
            )
        })
    });
}

fn bench_shift_tail(c: &mut Criterion) {
    let base = striped(0, 256);

    c.bench_function("sector_shift_tail", |b| {
        b.iter(|| {
            let mut set = base.clone();
            set.shift_tail(black_box(512), black_box(-3));
            black_box(set)
        })
    });
}

criterion_group!(
    benches,
    bench_add_coalescing,
    bench_sub_splitting,
    bench_contains_range,
    bench_joined_walk,
    bench_shift_tail,
);
criterion_main!(benches);
