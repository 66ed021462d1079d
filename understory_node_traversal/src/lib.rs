// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_node_traversal --heading-base-level=0

//! Understory Node Traversal: structural queries over node store snapshots.
//!
//! Every query is a pure function of one [`NodesState`](understory_node_store::NodesState)
//! snapshot; nothing here mutates the store or keeps a cursor, so any query can be
//! rerun at will.
//!
//! - [`RootView`]: the page set. `all_nodes`, `find_page`, id lookups, `children`, `flat`.
//! - [`PageView`]: one page. `children`, `first_child`, `flat`, id lookups.
//! - [`NodeView`]: one node. Everything a page has, plus `parent`, `parents` and `closest`.
//! - [`TargetView`]: any of the three, with misuse reported as [`TraversalError`].
//!
//! ## Matchers and restrictions
//!
//! A [`Filter`] bundles an optional [`Matcher`] and an optional [`Restriction`].
//! Matchers answer `Some(true)`, `Some(false)` or `None` ("does not apply"); `None`
//! includes the candidate in collecting walks (`children`, `flat`, `parents`) and skips
//! it in searches (`closest`). A restriction keeps only nodes in one row of their
//! innermost repeating structure, and applies to the first level only: `flat` on a
//! repeating structure restricted to row 0 returns row 0's nodes and everything under
//! them, including every row of nested repeating structures.
//!
//! ## Ordering
//!
//! Siblings come in declaration order, with repeating-row instances ordered by row
//! index. `flat` is depth-first pre-order.
//!
//! ```
//! use std::sync::Arc;
//! use understory_node_commit::{CommitQueue, DeclaredProps, Generator, StaticRows};
//! use understory_node_store::{LayoutSet, NodesStore, ResetSeed, RowId};
//! use understory_node_traversal::{Filter, IsRepeating, RootView};
//!
//! let layouts = Arc::new(LayoutSet::from_json(r#"{ "P1": [
//!     { "id": "A", "type": "Group", "children": [
//!         { "id": "B", "type": "RepeatingGroup", "repeating": true, "children": [
//!             { "id": "D", "type": "Input" } ] },
//!         { "id": "C", "type": "Paragraph" } ] } ] }"#).unwrap());
//! let mut store = NodesStore::default();
//! store.reset(layouts, ResetSeed::default());
//! let rows = StaticRows::new().with("B", [RowId::new("x"), RowId::new("y")]);
//! let mut queue = CommitQueue::default();
//! Generator::default().run(&store.snapshot(), &rows, &DeclaredProps, &mut queue);
//! queue.flush(&mut store);
//!
//! let root = RootView::new(store.state());
//! let a = root.node("A").unwrap();
//! let ids: Vec<_> = a.flat(Filter::all()).iter().map(|n| n.id().to_string()).collect();
//! assert_eq!(ids, ["B", "D-0", "D-1", "C"]);
//!
//! let d1 = root.node("D-1").unwrap();
//! let group = d1.closest(Filter::matching(&IsRepeating)).unwrap();
//! assert_eq!(group.id(), "B");
//! ```

mod matcher;
mod target;
mod views;

pub use matcher::{Candidate, Filter, HasId, IsRepeating, Matcher, Restriction, TypeIs};
pub use target::{TargetKind, TargetView, TraversalError};
pub use views::{NodeView, PageView, RootView};
