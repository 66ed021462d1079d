// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_node_commit::{CommitQueue, DeclaredProps, Generator, StaticRows};
use understory_node_store::{ComponentDecl, LayoutSet, NodesStore, PageKey, ResetSeed, RowId};
use understory_node_traversal::{Filter, RootView};

/// One page with a repeating structure of `rows` rows, each holding `cols` inputs.
fn gen_table_layout(cols: usize) -> Arc<LayoutSet> {
    let cells = (0..cols)
        .map(|c| ComponentDecl::new(format!("cell{c}"), "Input"))
        .collect();
    Arc::new(LayoutSet::new([(
        PageKey::from("table"),
        vec![
            ComponentDecl::new("rows", "RepeatingGroup")
                .repeating()
                .with_children(cells),
        ],
    )]))
}

fn gen_rows(rows: usize) -> StaticRows {
    StaticRows::new().with("rows", (0..rows).map(|r| RowId::new(format!("r{r}"))))
}

fn generated_store(layouts: &Arc<LayoutSet>, rows: &StaticRows) -> NodesStore {
    let mut store = NodesStore::default();
    store.reset(Arc::clone(layouts), ResetSeed::default());
    let mut queue = CommitQueue::default();
    Generator::default().run(&store.snapshot(), rows, &DeclaredProps, &mut queue);
    queue.flush(&mut store);
    store
}

fn bench_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("flush");
    for &(rows, cols) in &[(100usize, 10usize), (1000, 10), (1000, 40)] {
        let layouts = gen_table_layout(cols);
        let row_source = gen_rows(rows);
        group.throughput(Throughput::Elements((rows * cols) as u64));
        group.bench_function(format!("generate_flush_r{rows}_c{cols}"), |b| {
            b.iter_batched(
                || {
                    let mut store = NodesStore::default();
                    store.reset(Arc::clone(&layouts), ResetSeed::default());
                    store
                },
                |mut store| {
                    let mut queue = CommitQueue::default();
                    Generator::default().run(&store.snapshot(), &row_source, &DeclaredProps, &mut queue);
                    let report = queue.flush(&mut store);
                    black_box(report);
                },
                BatchSize::SmallInput,
            );
        });
        group.bench_function(format!("regenerate_unchanged_r{rows}_c{cols}"), |b| {
            b.iter_batched(
                || generated_store(&layouts, &row_source),
                |mut store| {
                    let mut queue = CommitQueue::default();
                    Generator::default().run(&store.snapshot(), &row_source, &DeclaredProps, &mut queue);
                    black_box(queue.flush(&mut store));
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_flat(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat");
    for &(rows, cols) in &[(100usize, 10usize), (1000, 10)] {
        let layouts = gen_table_layout(cols);
        let store = generated_store(&layouts, &gen_rows(rows));
        group.throughput(Throughput::Elements((rows * cols) as u64));
        group.bench_function(format!("all_nodes_r{rows}_c{cols}"), |b| {
            b.iter(|| {
                let root = RootView::new(store.state());
                black_box(root.all_nodes().len())
            });
        });
        group.bench_function(format!("children_in_row_r{rows}_c{cols}"), |b| {
            b.iter(|| {
                let root = RootView::new(store.state());
                let Some(table) = root.node("rows") else {
                    return 0;
                };
                black_box(table.children(Filter::all().in_row(rows / 2)).len())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_flush, bench_flat);
criterion_main!(benches);
