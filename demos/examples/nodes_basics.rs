// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node store basics.
//!
//! Loads a two-page layout, generates its nodes through the commit queue, then
//! runs a few traversal queries and a plugin mutation against the snapshot.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p understory_demos --example nodes_basics`

use std::sync::Arc;

use serde_json::json;
use tracing_subscriber::EnvFilter;
use understory_node_commit::{CommitQueue, DeclaredProps, Generator, StaticRows};
use understory_node_store::{LayoutSet, NodesStore, PluginRegistry, ResetSeed};
use understory_node_traversal::{Filter, RootView, TypeIs};

const FORM: &str = r#"{
    "intro": [
        { "id": "title", "type": "Header", "size": "L" },
        { "id": "name", "type": "Input", "required": true }
    ],
    "details": [
        { "id": "contact", "type": "Group", "children": [
            { "id": "email", "type": "Input" },
            { "id": "phone", "type": "Input" }
        ]}
    ]
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let layouts = Arc::new(LayoutSet::from_json(FORM)?);
    let mut store = NodesStore::new(PluginRegistry::builtin()?);
    store.reset(layouts, ResetSeed::default());
    let _subscription = store.subscribe(|state| {
        println!("published v{} with {} nodes", state.version(), state.node_count());
    });

    let mut queue = CommitQueue::default();
    let generated = Generator::default().run(&store.snapshot(), &StaticRows::new(), &DeclaredProps, &mut queue);
    println!("generation: {generated:?}");
    let report = queue.flush(&mut store);
    println!("flush: {report:?}");

    let root = RootView::new(store.state());
    for page in root.pages() {
        let ids: Vec<_> = page.flat(Filter::all()).iter().map(|n| n.id().to_string()).collect();
        println!("page {}: {ids:?}", page.key());
    }

    let inputs = TypeIs("Input".into());
    let email = root.node("email").ok_or("email was not generated")?;
    println!(
        "email parents: {:?}",
        email.parents(Filter::all()).iter().map(|c| c.id()).collect::<Vec<_>>()
    );
    println!("inputs anywhere: {}", root.flat(Filter::matching(&inputs)).len());
    println!("name item: {}", store.state().node("name").map_or(json!(null), |n| n.item.clone()));

    store.run_plugin_mutation(
        "set_validations",
        "email",
        &json!([{ "code": "format", "severity": "error", "message": "Not an email" }]),
    )?;
    println!(
        "email has errors: {:?}",
        store.query_plugin("has_errors", "email", &json!({}))?
    );
    Ok(())
}
