//! B-tree benchmarks for treeline.
//!
//! Every node touch is a positioned read or write, so these numbers are
//! dominated by I/O through the OS page cache. They are most useful for
//! comparing degrees and spotting regressions in the rebalancing paths.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::tempdir;
use treeline::BTreeIndex;

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_insert");

    for count in [100u64, 1000].iter() {
        group.throughput(Throughput::Elements(*count));
        group.bench_with_input(BenchmarkId::new("sequential", count), count, |b, &count| {
            b.iter_with_setup(
                || tempdir().unwrap(),
                |dir| {
                    let path = dir.path().join("bench.btree");
                    let mut index = BTreeIndex::open(&path, 32, 16).unwrap();
                    for i in 0..count {
                        let key = format!("key{i:08}");
                        index.put(key.as_bytes(), i).unwrap();
                    }
                    dir
                },
            );
        });

        group.bench_with_input(BenchmarkId::new("random", count), count, |b, &count| {
            b.iter_with_setup(
                || {
                    let mut order: Vec<u64> = (0..count).collect();
                    // deterministic shuffle, no RNG state to carry
                    for i in (1..order.len()).rev() {
                        let j = (i * 7919) % (i + 1);
                        order.swap(i, j);
                    }
                    (tempdir().unwrap(), order)
                },
                |(dir, order)| {
                    let path = dir.path().join("bench.btree");
                    let mut index = BTreeIndex::open(&path, 32, 16).unwrap();
                    for i in order {
                        let key = format!("key{i:08}");
                        index.put(key.as_bytes(), i).unwrap();
                    }
                    dir
                },
            );
        });
    }

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_get");

    let dir = tempdir().unwrap();
    let path = dir.path().join("bench.btree");
    let mut index = BTreeIndex::open(&path, 32, 16).unwrap();
    for i in 0..10_000u64 {
        let key = format!("key{i:08}");
        index.put(key.as_bytes(), i).unwrap();
    }

    group.throughput(Throughput::Elements(1));
    group.bench_function("hit", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key{:08}", i % 10_000);
            i += 1;
            black_box(index.get(key.as_bytes()).unwrap())
        });
    });
    group.bench_function("miss", |b| {
        b.iter(|| black_box(index.get(b"missing").unwrap()));
    });

    group.finish();
}

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_churn");

    group.throughput(Throughput::Elements(1000));
    group.bench_function("put_remove_degree_2", |b| {
        b.iter_with_setup(
            || tempdir().unwrap(),
            |dir| {
                let path = dir.path().join("bench.btree");
                let mut index = BTreeIndex::open(&path, 2, 8).unwrap();
                for i in 0..1000u64 {
                    let key = [b'a' + (i * 31 % 26) as u8];
                    if index.contains(&key).unwrap() {
                        index.remove(&key).unwrap();
                    } else {
                        index.put(&key, i).unwrap();
                    }
                }
                dir
            },
        );
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_get, bench_churn);
criterion_main!(benches);
