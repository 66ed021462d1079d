// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Repeating rows.
//!
//! Generates a repeating group, deletes a row from the middle and regenerates,
//! shows that removals queued against replaced layouts are dropped, applies a
//! hidden rule, and drives the generation stages to completion while waiting on
//! the commit queue's settle signal.
//!
//! Run:
//! - `RUST_LOG=understory_node_store=debug cargo run -p understory_demos --example repeating_rows`

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;
use understory_node_commit::{
    CommitQueue, DeclaredProps, Generator, SettleConfig, Stage, Stages, StaticRows,
};
use understory_node_store::{
    LayoutSet, NodeId, NodesStore, RemoveNodeRequest, ResetSeed, RowId, VisibilityOptions,
};
use understory_node_traversal::{Filter, NodeView, RootView};

const FORM: &str = r#"{
    "people": [
        { "id": "persons", "type": "RepeatingGroup", "repeating": true, "children": [
            { "id": "first", "type": "Input" },
            { "id": "last", "type": "Input" }
        ]},
        { "id": "summary", "type": "Paragraph" }
    ]
}"#;

fn ids(nodes: &[NodeView<'_>]) -> Vec<String> {
    nodes.iter().map(|n| n.id().to_string()).collect()
}

fn print_page(store: &NodesStore, label: &str) {
    let root = RootView::new(store.state());
    let Some(page) = root.find_page("people") else {
        return;
    };
    let opts = VisibilityOptions::default();
    let visible: Vec<_> = page
        .flat(Filter::all())
        .into_iter()
        .filter(|n| !n.is_hidden(opts))
        .collect();
    println!("{label}: {:?}", ids(&visible));
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let layouts = Arc::new(LayoutSet::from_json(FORM)?);
    let mut store = NodesStore::default();
    store.reset(Arc::clone(&layouts), ResetSeed::default());

    let mut queue = CommitQueue::new(SettleConfig {
        poll_interval: Duration::from_millis(5),
        grace: Duration::from_millis(5),
    });
    let mut stages = Stages::new();
    let generator = Generator::default();

    let mut rows = StaticRows::new().with("persons", ["ada", "bob", "cy"].map(RowId::new));
    generator.run(&store.snapshot(), &rows, &DeclaredProps, &mut queue);

    // Flush from one branch while the other waits for the queue to drain.
    let mut waiter = queue.settle_handle();
    let flusher = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.flush(&mut store)
    };
    let (settled, report) = tokio::join!(waiter.wait(), flusher);
    settled?;
    info!(added = report.nodes_added, "first generation settled");
    print_page(&store, "three rows");

    // Deleting "bob" shifts "cy" down to index 1; the last row's nodes go away.
    rows.set("persons", ["ada", "cy"].map(RowId::new));
    let regen = generator.run(&store.snapshot(), &rows, &DeclaredProps, &mut queue);
    println!("regeneration: {regen:?}");
    queue.flush(&mut store);
    print_page(&store, "bob deleted");
    if let Some(record) = store.state().node("first-1") {
        println!("first-1 now belongs to row {:?}", record.row);
    }

    // A removal generated against the old layouts is ignored after a reset.
    let stale = Arc::clone(&layouts);
    let fresh = Arc::new(LayoutSet::from_json(FORM)?);
    store.reset(Arc::clone(&fresh), ResetSeed::default());
    generator.run(&store.snapshot(), &rows, &DeclaredProps, &mut queue);
    queue.remove_node(RemoveNodeRequest {
        node_id: NodeId::with_rows("first", &[0]),
        layouts: stale,
    });
    let report = queue.flush(&mut store);
    println!(
        "after reset: removed {} (stale removal dropped), first-0 present: {}",
        report.nodes_removed,
        store.state().node("first-0").is_some()
    );

    // Rules hide the whole second row.
    store.mark_hidden_via_rule(BTreeSet::from(["first-1".to_owned(), "last-1".to_owned()]));
    print_page(&store, "row 1 hidden");

    let finished = stages.settle(&queue, &mut store);
    assert_eq!(finished, Stage::Finished, "stages should finish once settled");
    println!("ready: {}", store.state().is_ready());
    Ok(())
}
