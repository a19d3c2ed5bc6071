use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};

use docops::{
    core::{dedup::DedupFilter, list::plan},
    document::MemoryDocument,
    engine::mutator::DocumentMutator,
    op::{Operation, normalize_batch},
    runtime::serializer::spawn_serializer,
};

fn raw_batch(n: usize) -> Vec<Value> {
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        if i % 10 == 0 {
            out.push(json!({"op": "list.start"}));
        } else if i % 10 < 5 {
            out.push(json!({"op": "list.item", "text": format!("item {i}")}));
        } else if i % 10 == 5 {
            out.push(json!({"op": "list.end"}));
        } else {
            out.push(json!({"kind": "paragraph.insert", "text": format!("para {i}")}));
        }
    }
    out
}

fn bench_normalize_and_plan(c: &mut Criterion) {
    let raw = raw_batch(10_000);
    c.bench_function("normalize_plan_10k", |b| {
        b.iter(|| {
            let ops = normalize_batch(&raw);
            let _ = plan(ops);
        });
    });
}

fn bench_dedup(c: &mut Criterion) {
    let ops: Vec<Operation> = (0..10_000)
        .map(|i| Operation::paragraph(format!("line {}", i % 2_000)))
        .collect();
    c.bench_function("dedup_10k", |b| {
        b.iter(|| {
            let mut filter = DedupFilter::default();
            ops.iter().filter(|op| !filter.should_suppress(op)).count()
        });
    });
}

fn bench_serialized_batches(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("serialized_batches");

    for batches in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(batches), &batches, |b, &batches| {
            b.iter(|| {
                rt.block_on(async {
                    let (events_tx, _) = tokio::sync::broadcast::channel(16);
                    let handle = spawn_serializer(DocumentMutator::new(
                        Box::new(MemoryDocument::new("doc://bench")),
                        events_tx,
                    ));
                    for i in 0..batches {
                        let planned = plan(vec![Operation::paragraph(format!("p{i}"))]);
                        let _ = handle.submit_with("batch", move |m| m.apply_batch(&planned));
                    }
                    handle.barrier().wait().await.expect("barrier");
                });
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_normalize_and_plan, bench_dedup, bench_serialized_batches);
criterion_main!(benches);
