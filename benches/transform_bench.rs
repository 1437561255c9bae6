//! Benchmark the elementwise transform over dictionary-encoded and plain columns.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use colflow::table::{ArrowTable, Column, Table};
use colflow::testutil::generate_batch;
use colflow::transform::ElementwiseTransform;

const ROWS: usize = 1_000_000;
const BATCH_SIZE: usize = 10_240;
const CARDINALITIES: &[usize] = &[16, 4096];

fn plain_copy(batch: &RecordBatch) -> RecordBatch {
    let tags = cast(batch.column(1), &DataType::Utf8).unwrap();
    RecordBatch::try_from_iter(vec![("tag", tags)]).unwrap()
}

fn drain(table: &mut ArrowTable, transform: &dyn Column) -> usize {
    table.reset();
    let mut getter = transform.current_getter();
    let mut total = 0;
    while table.next(BATCH_SIZE).unwrap() > 0 {
        let batch = getter().unwrap();
        total += black_box(batch.count());
    }
    total
}

fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("uppercase");
    group.throughput(Throughput::Elements(ROWS as u64));
    group.sample_size(10);

    for &cardinality in CARDINALITIES {
        let encoded = generate_batch(ROWS, cardinality, 42);
        let plain = plain_copy(&encoded);

        let mut table = ArrowTable::try_new(&encoded).unwrap();
        let transform = ElementwiseTransform::build(
            "upper",
            table.column("tag").unwrap(),
            |s: &String| s.to_uppercase(),
        )
        .unwrap();
        group.bench_with_input(
            BenchmarkId::new("dictionary", cardinality),
            &cardinality,
            |b, _| b.iter(|| drain(&mut table, &transform)),
        );

        let mut table = ArrowTable::try_new(&plain).unwrap();
        let transform = ElementwiseTransform::build(
            "upper",
            table.column("tag").unwrap(),
            |s: &String| s.to_uppercase(),
        )
        .unwrap();
        group.bench_with_input(
            BenchmarkId::new("plain", cardinality),
            &cardinality,
            |b, _| b.iter(|| drain(&mut table, &transform)),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_transform);
criterion_main!(benches);
