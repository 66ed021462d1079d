// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_node_commit --heading-base-level=0

//! Understory Node Commit: batching between the generation pass and the node store.
//!
//! Many independent decisions are made while walking a layout (one per component and
//! row), but the store should see one write per cycle. This crate provides:
//!
//! - [`CommitQueue`]: an explicit command queue. Generation units push add, remove and
//!   patch requests; the scheduler calls [`CommitQueue::flush`] once per cycle.
//! - [`SettleWaiter`]: an async signal that resolves once the queue has drained, with a
//!   polling fallback. Timing is configured by [`SettleConfig`].
//! - [`Generator`]: the generation pass. It diffs the layouts against the current
//!   snapshot, with rows supplied by a [`RowSource`] and items by an [`ItemResolver`].
//! - [`Stages`]: numbered runs through [`Stage`]s that end by marking the store ready.
//!
//! ## Minimal usage
//!
//! ```
//! use std::sync::Arc;
//! use understory_node_commit::{CommitQueue, DeclaredProps, Generator, StaticRows};
//! use understory_node_store::{LayoutSet, NodesStore, ResetSeed, RowId};
//!
//! let layouts = Arc::new(
//!     LayoutSet::from_json(
//!         r#"{ "main": [ { "id": "people", "type": "RepeatingGroup", "repeating": true,
//!                          "children": [ { "id": "name", "type": "Input" } ] } ] }"#,
//!     )
//!     .unwrap(),
//! );
//! let mut store = NodesStore::default();
//! store.reset(layouts, ResetSeed::default());
//!
//! let rows = StaticRows::new().with("people", [RowId::new("a"), RowId::new("b")]);
//! let mut queue = CommitQueue::default();
//! Generator::default().run(&store.snapshot(), &rows, &DeclaredProps, &mut queue);
//! assert_eq!(queue.schedule_count(), 1);
//!
//! let report = queue.flush(&mut store);
//! assert_eq!(report.nodes_added, 3);
//! assert!(store.state().node("name-1").is_some());
//! ```

mod generator;
mod queue;
mod settle;
mod stages;

pub use generator::{
    DeclaredProps, GenerationReport, Generator, GeneratorConfig, ItemResolver, RowSource,
    StaticRows,
};
pub use queue::{CommitQueue, CommitReport};
pub use settle::{SettleConfig, SettleError, SettleWaiter};
pub use stages::{Stage, Stages};
