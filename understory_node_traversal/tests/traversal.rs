// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Traversal over generated trees with repeating rows.

use std::collections::BTreeSet;
use std::sync::Arc;

use understory_node_commit::{CommitQueue, DeclaredProps, Generator, StaticRows};
use understory_node_store::{LayoutSet, NodesState, NodesStore, ResetSeed, RowId, VisibilityOptions};
use understory_node_traversal::{
    Candidate, Filter, HasId, IsRepeating, Matcher, NodeView, Restriction, RootView, TargetView,
    TypeIs,
};

const FORM: &str = r#"{
    "P1": [
        { "id": "A", "type": "Group", "children": [
            { "id": "B", "type": "RepeatingGroup", "repeating": true, "children": [
                { "id": "D", "type": "Input" }
            ]},
            { "id": "C", "type": "Paragraph" }
        ]}
    ],
    "P2": [
        { "id": "O", "type": "RepeatingGroup", "repeating": true, "children": [
            { "id": "N", "type": "RepeatingGroup", "repeating": true, "children": [
                { "id": "L", "type": "Input" }
            ]},
            { "id": "T", "type": "Input" }
        ]}
    ]
}"#;

fn row_ids(prefix: &str, n: usize) -> Vec<RowId> {
    (0..n).map(|i| RowId::new(format!("{prefix}{i}"))).collect()
}

fn build() -> NodesStore {
    let layouts = Arc::new(LayoutSet::from_json(FORM).unwrap());
    let mut store = NodesStore::default();
    store.reset(layouts, ResetSeed::default());
    let rows = StaticRows::new()
        .with("B", row_ids("b", 2))
        .with("O", row_ids("o", 2))
        .with("N-0", row_ids("n0-", 1))
        .with("N-1", row_ids("n1-", 3));
    let mut queue = CommitQueue::default();
    Generator::default().run(&store.snapshot(), &rows, &DeclaredProps, &mut queue);
    queue.flush(&mut store);
    store
}

fn ids(nodes: &[NodeView<'_>]) -> Vec<String> {
    nodes.iter().map(|n| n.id().to_string()).collect()
}

#[test]
fn flat_from_group_lists_rows_in_order() {
    let store = build();
    let root = RootView::new(store.state());
    let a = root.node("A").unwrap();
    assert_eq!(ids(&a.flat(Filter::all())), ["B", "D-0", "D-1", "C"]);
}

#[test]
fn children_restricted_to_row_zero() {
    let store = build();
    let root = RootView::new(store.state());
    let b = root.node("B").unwrap();
    assert_eq!(ids(&b.children(Filter::all())), ["D-0", "D-1"]);
    assert_eq!(ids(&b.children(Filter::all().in_row(0))), ["D-0"]);
    let by_row_id = Restriction::Row(RowId::new("b1"));
    assert_eq!(ids(&b.children(Filter::all().restricted(&by_row_id))), ["D-1"]);
}

#[test]
fn parents_end_at_page() {
    let store = build();
    let root = RootView::new(store.state());
    let d1 = root.node("D-1").unwrap();
    let chain: Vec<_> = d1.parents(Filter::all()).iter().map(Candidate::id).collect();
    assert_eq!(chain, ["B", "A", "P1"]);
    assert!(d1.parents(Filter::all()).last().unwrap().as_page().is_some());
}

#[test]
fn parents_filtered_by_matcher() {
    let store = build();
    let root = RootView::new(store.state());
    let groups = TypeIs("Group".into());
    let chain: Vec<_> = root
        .node("D-0")
        .unwrap()
        .parents(Filter::matching(&groups))
        .iter()
        .map(Candidate::id)
        .collect();
    // The page answers `None` to a type matcher, so it is kept.
    assert_eq!(chain, ["A", "P1"]);
}

#[test]
fn closest_checks_self_first() {
    let store = build();
    let root = RootView::new(store.state());
    let b = root.node("B").unwrap();
    assert_eq!(b.closest(Filter::matching(&IsRepeating)).map(|c| c.id()), Some("B"));
    let c = root.node("C").unwrap();
    assert!(c.closest(Filter::matching(&IsRepeating)).is_none());
    // Pages only match when the matcher says so explicitly.
    let page = HasId("P1".into());
    assert_eq!(c.closest(Filter::matching(&page)).map(|c| c.id()), Some("P1"));
}

#[test]
fn nested_repeating_rows_flatten_fully() {
    let store = build();
    let root = RootView::new(store.state());
    let o = root.node("O").unwrap();
    assert_eq!(
        ids(&o.flat(Filter::all())),
        ["N-0", "L-0-0", "T-0", "N-1", "L-1-0", "L-1-1", "L-1-2", "T-1"]
    );
    // Restriction applies to the first level, then every nested row is included.
    assert_eq!(
        ids(&o.flat(Filter::all().in_row(1))),
        ["N-1", "L-1-0", "L-1-1", "L-1-2", "T-1"]
    );
}

#[test]
fn find_by_id_prefers_same_row() {
    let store = build();
    let root = RootView::new(store.state());
    let t1 = root.node("T-1").unwrap();
    assert_eq!(t1.find_by_id("N").map(|n| n.id().to_string()), Some("N-1".into()));
    assert_eq!(t1.find_by_id("L").map(|n| n.id().to_string()), Some("L-1-0".into()));
    assert_eq!(t1.find_by_id("D-1").map(|n| n.id().to_string()), Some("D-1".into()));
    assert_eq!(ids(&root.find_all_by_id("L")), ["L-0-0", "L-1-0", "L-1-1", "L-1-2"]);
    assert_eq!(root.find_by_id("L").map(|n| n.id().to_string()), Some("L-0-0".into()));
    assert!(root.find_by_id("missing").is_none());
}

#[test]
fn all_nodes_and_pages_from_root_only() {
    let store = build();
    let root = RootView::new(store.state());
    assert_eq!(root.all_nodes().len(), store.state().node_count());
    assert!(root.find_page("P2").is_some());
    let node = TargetView::from(root.node("A").unwrap());
    assert!(node.all_nodes().is_err());
    assert!(node.find_page("P1").is_err());
    assert_eq!(node.parents(Filter::all()).unwrap().len(), 1);
    assert_eq!(TargetView::from(root).children(Filter::all()).len(), 2);
}

#[test]
fn closure_matchers_decide_or_defer() {
    let store = build();
    let root = RootView::new(store.state());
    let only_second_row = |_: &NodesState, c: &Candidate<'_>| {
        c.as_node()
            .and_then(|(_, record)| record.row.as_ref())
            .map(|row| row.index == 1)
    };
    let picked = root.flat(Filter::matching(&only_second_row));
    // Nodes without a row (pages' top-level nodes, A, B, C, O) defer and are kept.
    assert!(picked.iter().any(|n| n.id().as_str() == "A"));
    assert!(picked.iter().all(|n| n.id().as_str() != "D-0"));
    assert!(picked.iter().any(|n| n.id().as_str() == "D-1"));
    assert_eq!(only_second_row.matches(store.state(), &root.find_page("P1").unwrap().candidate()), None);
}

#[test]
fn hidden_rows_are_reported_through_views() {
    let mut store = build();
    store.mark_hidden_via_rule(BTreeSet::from(["B".to_owned()]));
    let root = RootView::new(store.state());
    let opts = VisibilityOptions::default();
    assert!(root.node("D-0").unwrap().is_hidden(opts));
    assert!(!root.node("C").unwrap().is_hidden(opts));
    assert!(!root.find_page("P1").unwrap().is_hidden(opts));
}
