// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_node_store --heading-base-level=0

//! Understory Node Store: the versioned node/page table behind a form renderer.
//!
//! A form layout is a set of pages, each an ordered tree of component declarations.
//! Components inside repeating structures are materialized once per row, so the live
//! tree is bigger (and more dynamic) than the declaration tree. This crate holds that
//! live tree.
//!
//! - [`LayoutSet`]: parsed layout description, shared by `Arc` and compared by identity.
//! - [`NodeId`]: base component id plus the row index of every enclosing repeating structure,
//!   rendered as `base-i-j`.
//! - [`NodesStore`]: batch mutations that publish immutable [`NodesState`] snapshots.
//! - [`PluginRegistry`]: per-feature node state (validation, attachments, ...) with
//!   collision-checked field and entry point names.
//!
//! ## Snapshots and identity
//!
//! Every batch operation publishes at most one new snapshot. A batch that changes
//! nothing (all targets missing, all requests stale, or all values deep-equal to what is
//! stored) keeps the previous `Arc<NodesState>`, so consumers can skip work with
//! [`Arc::ptr_eq`](std::sync::Arc::ptr_eq).
//!
//! ## Stale and missing targets
//!
//! Requests are produced by a generation pass that is only loosely ordered relative to
//! layout swaps. Adds and removals carry the layouts they were generated against and are
//! dropped unless those are the store's current layouts. Patches to missing records are
//! dropped. None of this is an error.
//!
//! ## Minimal usage
//!
//! ```
//! use std::sync::Arc;
//! use understory_node_store::{
//!     AddNodeRequest, LayoutSet, NodeId, NodeRecord, NodesStore, PageKey, ParentRef, ResetSeed,
//! };
//!
//! let layouts = Arc::new(
//!     LayoutSet::from_json(r#"{ "main": [ { "id": "name", "type": "Input" } ] }"#).unwrap(),
//! );
//! let mut store = NodesStore::default();
//! store.reset(Arc::clone(&layouts), ResetSeed::default());
//! assert!(store.state().page("main").is_some());
//!
//! let page = PageKey::from("main");
//! store.add_nodes(vec![AddNodeRequest {
//!     node_id: NodeId::new("name"),
//!     record: NodeRecord::new("Input", page.clone(), ParentRef::Page(page)),
//!     layouts: Arc::clone(&layouts),
//! }]);
//!
//! // Adding the same record again is not a change.
//! let before = store.snapshot();
//! store.add_nodes(vec![AddNodeRequest {
//!     node_id: NodeId::new("name"),
//!     record: NodeRecord::new("Input", PageKey::from("main"), ParentRef::Page(PageKey::from("main"))),
//!     layouts,
//! }]);
//! assert!(Arc::ptr_eq(&before, &store.snapshot()));
//! ```

mod id;
mod layout;
mod plugin;
pub mod plugins;
mod record;
mod store;
mod visibility;

pub use id::{NodeId, PageKey, ParentRef, RowDescriptor, RowId};
pub use layout::{ComponentDecl, DeclInfo, DuplicateDecl, LayoutError, LayoutSet};
pub use plugin::{
    NodeDataPlugin, PluginError, PluginPatches, PluginRegistry, RESERVED_FIELDS, parse_args,
};
pub use record::{GeneratorErrors, HiddenFlags, NodeRecord, PageRecord};
pub use store::{
    AddErrorRequest, AddNodeRequest, ErrorList, ErrorTarget, NodePatch, NodesState, NodesStore,
    Readiness, RemoveNodeRequest, ResetSeed, SetNodePropRequest, SetPagePropRequest,
    Subscription,
};
pub use visibility::VisibilityOptions;
