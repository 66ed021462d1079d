// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Store-level behavior: reset, stale requests, equality short-circuits, rule ingestion.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::json;
use understory_node_store::{
    AddNodeRequest, LayoutSet, NodeId, NodePatch, NodeRecord, NodesStore, PageKey, ParentRef,
    RemoveNodeRequest, ResetSeed, SetNodePropRequest,
};

const LAYOUT: &str = r#"{
    "pageA": [ { "id": "name", "type": "Input" }, { "id": "age", "type": "Input" } ],
    "pageB": [ { "id": "summary", "type": "Summary" } ]
}"#;

fn layouts() -> Arc<LayoutSet> {
    Arc::new(LayoutSet::from_json(LAYOUT).unwrap())
}

fn add(id: &str, page: &str, layouts: &Arc<LayoutSet>) -> AddNodeRequest {
    let page = PageKey::from(page);
    AddNodeRequest {
        node_id: NodeId::new(id),
        record: NodeRecord::new("Input", page.clone(), ParentRef::Page(page)),
        layouts: Arc::clone(layouts),
    }
}

#[test]
fn reset_prepopulates_every_page() {
    let mut store = NodesStore::default();
    store.reset(layouts(), ResetSeed::default());
    let state = store.state();
    assert!(state.page("pageA").is_some(), "pageA should exist before any node is added");
    assert!(state.page("pageB").is_some(), "pageB should exist before any node is added");
    assert_eq!(state.node_count(), 0);
    let order: Vec<_> = state.pages().map(|p| p.page_key.as_str()).collect();
    assert_eq!(order, ["pageA", "pageB"]);
}

#[test]
fn stale_removal_leaves_store_unchanged() {
    let old = layouts();
    let mut store = NodesStore::default();
    store.reset(Arc::clone(&old), ResetSeed::default());
    store.add_nodes(vec![add("name", "pageA", &old)]);

    // Same content, new identity: a layout swap.
    let new = layouts();
    store.reset(Arc::clone(&new), ResetSeed::default());
    store.add_nodes(vec![add("name", "pageA", &new)]);

    let before = store.snapshot();
    let removed = store.remove_nodes(vec![RemoveNodeRequest {
        node_id: NodeId::new("name"),
        layouts: old,
    }]);
    assert_eq!(removed, 0);
    assert!(Arc::ptr_eq(&before, &store.snapshot()));
    assert!(store.state().node("name").is_some());
}

#[test]
fn stale_add_is_dropped() {
    let old = layouts();
    let mut store = NodesStore::default();
    store.reset(layouts(), ResetSeed::default());
    assert_eq!(store.add_nodes(vec![add("name", "pageA", &old)]), 0);
    assert_eq!(store.state().node_count(), 0);
}

#[test]
fn removal_of_missing_node_publishes_nothing() {
    let l = layouts();
    let mut store = NodesStore::default();
    store.reset(Arc::clone(&l), ResetSeed::default());
    let version = store.state().version();
    store.remove_nodes(vec![RemoveNodeRequest {
        node_id: NodeId::new("ghost"),
        layouts: l,
    }]);
    assert_eq!(store.state().version(), version);
}

#[test]
fn deep_equal_patch_keeps_snapshot_identity() {
    let l = layouts();
    let mut store = NodesStore::default();
    store.reset(Arc::clone(&l), ResetSeed::default());
    store.add_nodes(vec![add("name", "pageA", &l)]);
    let patch = || SetNodePropRequest {
        node_id: NodeId::new("name"),
        patch: NodePatch::Item(json!({ "label": "Name", "required": true })),
    };
    assert_eq!(store.set_node_props(vec![patch()]), 1);
    let before = store.snapshot();
    // A structurally identical value built from scratch.
    assert_eq!(store.set_node_props(vec![patch()]), 0);
    assert!(Arc::ptr_eq(&before, &store.snapshot()));
    assert_eq!(store.state().version(), before.version());
}

#[test]
fn patch_of_unknown_node_is_ignored() {
    let l = layouts();
    let mut store = NodesStore::default();
    store.reset(l, ResetSeed::default());
    let before = store.snapshot();
    store.set_node_props(vec![SetNodePropRequest {
        node_id: NodeId::new("nobody"),
        patch: NodePatch::Item(json!(1)),
    }]);
    assert!(Arc::ptr_eq(&before, &store.snapshot()));
}

#[test]
fn hidden_rule_ingestion_is_stable() {
    let mut store = NodesStore::default();
    store.reset(layouts(), ResetSeed::default());
    assert!(!store.state().hidden_via_rules_ran());

    let v0 = store.state().version();
    assert!(store.mark_hidden_via_rule(BTreeSet::from(["x".to_owned()])));
    assert!(store.state().hidden_via_rules_ran());
    assert_eq!(store.state().version(), v0 + 1);

    let before = store.snapshot();
    assert!(!store.mark_hidden_via_rule(BTreeSet::from(["x".to_owned()])));
    assert!(Arc::ptr_eq(&before, &store.snapshot()));
}

#[test]
fn first_identical_rule_result_only_flips_ran_flag() {
    let mut store = NodesStore::default();
    store.reset(layouts(), ResetSeed::default());
    let before = store.snapshot();
    assert!(store.mark_hidden_via_rule(BTreeSet::new()));
    let after = store.snapshot();
    assert!(after.hidden_via_rules_ran());
    assert_eq!(after.hidden_via_rules(), before.hidden_via_rules());
    assert!(!store.mark_hidden_via_rule(BTreeSet::new()));
}

#[test]
fn add_remove_counter_tracks_structure_only() {
    let l = layouts();
    let mut store = NodesStore::default();
    store.reset(Arc::clone(&l), ResetSeed::default());
    let c0 = store.state().add_remove_counter();
    store.add_nodes(vec![add("name", "pageA", &l)]);
    let c1 = store.state().add_remove_counter();
    assert_eq!(c1, c0 + 1);
    store.set_node_props(vec![SetNodePropRequest {
        node_id: NodeId::new("name"),
        patch: NodePatch::Item(json!({ "x": 1 })),
    }]);
    assert_eq!(store.state().add_remove_counter(), c1);
    store.remove_nodes(vec![RemoveNodeRequest {
        node_id: NodeId::new("name"),
        layouts: l,
    }]);
    assert_eq!(store.state().add_remove_counter(), c1 + 1);
}
