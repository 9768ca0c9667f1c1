//! Diff, copy and import benchmarks.

use bucketdb_bench::utils::{dump_text, seeded_database, sorted_records};
use bucketdb_core::{
    compare_buckets, copy_database, import_dump, CopyConfig, DiffConfig, DiffEntry, DiffSink,
    CoreResult, ImportConfig, NeverCancel,
};
use bucketdb_kv::Database;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Counts entries without storing them.
struct Count(u64);

impl DiffSink for Count {
    fn entry(&mut self, _entry: DiffEntry) -> CoreResult<()> {
        self.0 += 1;
        Ok(())
    }
}

/// Benchmark the merge join over buckets that differ in every tenth record.
fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff");

    for count in [1_000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let left = sorted_records(count, 32);
            let right: Vec<_> = left
                .iter()
                .enumerate()
                .filter(|(i, _)| i % 10 != 0)
                .map(|(_, r)| r.clone())
                .collect();
            let left = seeded_database("T", &left);
            let right = seeded_database("T", &right);
            let left_tx = left.begin_read().unwrap();
            let right_tx = right.begin_read().unwrap();

            b.iter(|| {
                let mut sink = Count(0);
                compare_buckets(
                    &NeverCancel,
                    &left_tx,
                    "T",
                    &right_tx,
                    "T",
                    &DiffConfig::default(),
                    &mut sink,
                )
                .unwrap();
                black_box(sink.0);
            });
        });
    }
    group.finish();
}

/// Benchmark copying one bucket into a fresh database.
fn bench_copy(c: &mut Criterion) {
    let mut group = c.benchmark_group("copy");

    for count in [1_000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let source = seeded_database("T", &sorted_records(count, 32));

            b.iter(|| {
                let destination = Database::open_in_memory().unwrap();
                let stats =
                    copy_database(&NeverCancel, &source, &destination, &CopyConfig::default())
                        .unwrap();
                black_box(stats);
            });
        });
    }
    group.finish();
}

/// Benchmark parsing and importing a text dump.
fn bench_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("import");

    for count in [1_000, 10_000].iter() {
        let text = dump_text("T", &sorted_records(*count, 32));
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &text, |b, text| {
            b.iter(|| {
                let destination = Database::open_in_memory().unwrap();
                let stats = import_dump(
                    &NeverCancel,
                    black_box(text.as_bytes()),
                    &destination,
                    &ImportConfig::default(),
                )
                .unwrap();
                black_box(stats);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_diff, bench_copy, bench_import);
criterion_main!(benches);
