//! Construction and query benchmarks
//!
//! Run with: `cargo bench`
//! Save baseline: `cargo bench -- --save-baseline main`
//! Compare: `cargo bench -- --baseline main`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;
use tokdawg::index::{Cdawg, Dawg, DiskCdawg, Token, TokenStore};
use tokdawg::query::{CachedIndex, SuffixIndex, TraceOptions};

/// Zipf-like corpus: a few frequent tokens and a long tail
fn corpus(n: usize, vocab: u32, seed: u64) -> TokenStore {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut store = TokenStore::new();
    let mut doc = Vec::new();
    for _ in 0..n {
        let rank: f64 = rng.gen_range(0.0..1.0);
        doc.push((rank.powi(3) * vocab as f64) as Token);
        if rng.gen_range(0..200) == 0 {
            store.push_document(&doc);
            doc.clear();
        }
    }
    store.push_document(&doc);
    store
}

fn queries(store: &TokenStore, count: usize, len: usize, seed: u64) -> Vec<Vec<Token>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let text = store.as_slice();
    (0..count)
        .map(|_| {
            let start = rng.gen_range(0..text.len() - len);
            let mut query = text[start..start + len].to_vec();
            // Perturb so queries mix long matches with failures
            let i = rng.gen_range(0..len);
            query[i] = rng.gen_range(0..1000);
            query
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(10);

    for &n in &[10_000usize, 100_000] {
        let store = corpus(n, 5000, 7);
        group.throughput(Throughput::Elements(store.len() as u64));

        group.bench_with_input(BenchmarkId::new("dawg", n), &store, |b, store| {
            b.iter(|| {
                let mut dawg = Dawg::build(black_box(store));
                dawg.fill_counts();
                dawg
            })
        });

        group.bench_with_input(BenchmarkId::new("cdawg", n), &store, |b, store| {
            b.iter(|| {
                let mut cdawg = Cdawg::build(black_box(store));
                cdawg.fill_counts();
                cdawg
            })
        });
    }

    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let store = corpus(200_000, 5000, 11);
    let queries = queries(&store, 200, 64, 13);
    let options = TraceOptions::default();

    let mut dawg = Dawg::build(&store);
    dawg.fill_counts();
    let mut cdawg = Cdawg::build(&store);
    cdawg.fill_counts();

    let temp = TempDir::new().expect("Failed to create temp dir");
    cdawg.save(&temp.path().join("bench")).expect("Failed to save index");
    let disk = DiskCdawg::open_dir(&temp.path().join("bench")).expect("Failed to load index");
    let cached = CachedIndex::new(
        DiskCdawg::open_dir(&temp.path().join("bench")).expect("Failed to load index"),
        1 << 16,
    );

    let mut group = c.benchmark_group("query");
    group.throughput(Throughput::Elements((queries.len() * 64) as u64));

    group.bench_function("dawg_ram", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(dawg.trace(q, &options));
            }
        })
    });
    group.bench_function("cdawg_ram", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(cdawg.trace(q, &options));
            }
        })
    });
    group.bench_function("cdawg_disk", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(disk.trace(q, &options));
            }
        })
    });
    group.bench_function("cdawg_disk_cached", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(cached.trace(q, &options));
            }
        })
    });

    let with_stats = TraceOptions {
        entropies: true,
        next_tokens: Some(10),
    };
    group.bench_function("cdawg_ram_next_tokens", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(cdawg.trace(q, &with_stats));
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_query);
criterion_main!(benches);
