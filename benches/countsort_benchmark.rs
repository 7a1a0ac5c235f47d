use std::hint::black_box;
use std::io::Cursor;

use countsort_rs::countsort::{CountSortConfig, Engine};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

/// Generate `lines` lines drawn from `distinct` values with a skewed spread.
fn generate_text(lines: usize, distinct: u64) -> Vec<u8> {
    let mut data = Vec::new();
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    for _ in 0..lines {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let v = (state % distinct) * (state % distinct) % distinct;
        data.extend_from_slice(format!("value-{:08}\n", v).as_bytes());
    }
    data
}

fn run_once(data: &[u8], chunk_capacity: usize) -> u64 {
    let config = CountSortConfig {
        chunk_capacity,
        ..Default::default()
    };
    let mut engine = Engine::create(config).unwrap();
    let mut out = Vec::with_capacity(data.len());
    let stats = engine
        .run_with(&mut Cursor::new(data), &mut out)
        .unwrap();
    engine.close().unwrap();
    stats.distinct
}

fn bench_chunk_capacity(c: &mut Criterion) {
    let mut group = c.benchmark_group("countsort_chunk_capacity");
    let data = generate_text(200_000, 5_000);
    for capacity in [1_000, 10_000, 100_000, 1_000_000] {
        group.bench_with_input(
            BenchmarkId::new("lines", capacity),
            &data,
            |b, data| b.iter(|| run_once(black_box(data), capacity)),
        );
    }
    group.finish();
}

fn bench_distinct_ratio(c: &mut Criterion) {
    let mut group = c.benchmark_group("countsort_distinct");
    for distinct in [10, 1_000, 100_000] {
        let data = generate_text(200_000, distinct);
        group.bench_with_input(
            BenchmarkId::new("values", distinct),
            &data,
            |b, data| b.iter(|| run_once(black_box(data), 50_000)),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_chunk_capacity, bench_distinct_ratio);
criterion_main!(benches);
