// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flush ordering and the settle signal.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use understory_node_commit::{
    CommitQueue, DeclaredProps, Generator, SettleConfig, StaticRows,
};
use understory_node_store::{
    AddNodeRequest, LayoutSet, NodeId, NodePatch, NodeRecord, NodesStore, PageKey, ParentRef,
    RemoveNodeRequest, ResetSeed, RowId, SetNodePropRequest,
};

fn layouts() -> Arc<LayoutSet> {
    Arc::new(
        LayoutSet::from_json(
            r#"{ "P": [
                { "id": "R", "type": "RepeatingGroup", "repeating": true, "children": [
                    { "id": "F", "type": "Input" }
                ]},
                { "id": "X", "type": "Input" }
            ] }"#,
        )
        .unwrap(),
    )
}

fn add_x(layouts: &Arc<LayoutSet>) -> AddNodeRequest {
    let page = PageKey::from("P");
    AddNodeRequest {
        node_id: NodeId::new("X"),
        record: NodeRecord::new("Input", page.clone(), ParentRef::Page(page)),
        layouts: Arc::clone(layouts),
    }
}

#[test]
fn removal_wins_over_patch_in_same_flush() {
    let l = layouts();
    let mut store = NodesStore::default();
    store.reset(Arc::clone(&l), ResetSeed::default());
    store.add_nodes(vec![add_x(&l)]);

    let mut queue = CommitQueue::default();
    // Interleaved on purpose: the patch is queued after the removal.
    queue.set_node_prop(SetNodePropRequest {
        node_id: NodeId::new("X"),
        patch: NodePatch::Item(json!({ "before": true })),
    });
    queue.remove_node(RemoveNodeRequest {
        node_id: NodeId::new("X"),
        layouts: Arc::clone(&l),
    });
    queue.set_node_prop(SetNodePropRequest {
        node_id: NodeId::new("X"),
        patch: NodePatch::Item(json!({ "after": true })),
    });
    let report = queue.flush(&mut store);

    assert_eq!(report.nodes_removed, 1);
    assert_eq!(report.node_props_set, 0);
    assert!(store.state().node("X").is_none(), "patch must not resurrect a removed node");
}

#[test]
fn one_store_publish_per_buffer() {
    let l = layouts();
    let mut store = NodesStore::default();
    store.reset(Arc::clone(&l), ResetSeed::default());
    let rows = StaticRows::new().with("R", (0..50).map(|i| RowId::new(format!("row{i}"))));
    let mut queue = CommitQueue::default();
    let generated = Generator::default().run(&store.snapshot(), &rows, &DeclaredProps, &mut queue);
    assert_eq!(generated.added, 52);

    let report = queue.flush(&mut store);
    assert_eq!(report.nodes_added, 52);
    // Only the add buffer was non-empty.
    assert_eq!(report.version_after, report.version_before + 1);
}

#[test]
fn stale_requests_in_queue_are_harmless_after_reset() {
    let old = layouts();
    let mut store = NodesStore::default();
    store.reset(Arc::clone(&old), ResetSeed::default());
    let mut queue = CommitQueue::default();
    queue.add_node(add_x(&old));

    // Layout swap before the flush.
    store.reset(layouts(), ResetSeed::default());
    let report = queue.flush(&mut store);
    assert_eq!(report.requests, 1);
    assert_eq!(report.nodes_added, 0);
    assert!(!report.applied());
}

#[tokio::test]
async fn waiter_resolves_after_flush() {
    let l = layouts();
    let mut store = NodesStore::default();
    store.reset(Arc::clone(&l), ResetSeed::default());
    let mut queue = CommitQueue::new(SettleConfig {
        poll_interval: Duration::from_millis(1),
        grace: Duration::from_millis(1),
    });
    queue.add_node(add_x(&l));
    let mut waiter = queue.settle_handle();
    assert_eq!(waiter.pending(), 1);

    let flusher = async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        queue.flush(&mut store);
    };
    let (settled, ()) = tokio::join!(waiter.wait(), flusher);
    assert_eq!(settled, Ok(()));
    assert!(waiter.is_settled());
    assert!(store.state().node("X").is_some());
}

#[tokio::test]
async fn polling_waiter_resolves_after_flush() {
    let l = layouts();
    let mut store = NodesStore::default();
    store.reset(Arc::clone(&l), ResetSeed::default());
    let mut queue = CommitQueue::new(SettleConfig {
        poll_interval: Duration::from_millis(1),
        grace: Duration::ZERO,
    });
    queue.add_node(add_x(&l));
    let waiter = queue.settle_handle();

    let flusher = async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        queue.flush(&mut store);
    };
    let (settled, ()) = tokio::join!(waiter.wait_polling(), flusher);
    assert_eq!(settled, Ok(()));
}

#[tokio::test]
async fn settled_queue_resolves_immediately() {
    let queue = CommitQueue::new(SettleConfig {
        poll_interval: Duration::from_millis(1),
        grace: Duration::ZERO,
    });
    let mut waiter = queue.settle_handle();
    assert_eq!(waiter.wait().await, Ok(()));
}
