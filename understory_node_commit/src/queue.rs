// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The command queue between generation and the store.

use tokio::sync::watch;
use tracing::{debug, instrument};
use understory_node_store::{
    AddErrorRequest, AddNodeRequest, NodesStore, PageKey, RemoveNodeRequest, SetNodePropRequest,
    SetPagePropRequest,
};

use crate::settle::{SettleConfig, SettleWaiter};

/// Summary of one [`CommitQueue::flush`].
///
/// Request counts are what was drained; change counts are what the store
/// reported as actually changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Requests drained from all buffers.
    pub requests: usize,
    /// Page records created.
    pub pages_added: usize,
    /// Node records inserted or overwritten.
    pub nodes_added: usize,
    /// Node records deleted.
    pub nodes_removed: usize,
    /// Node patches that changed something.
    pub node_props_set: usize,
    /// Page patches that changed something.
    pub page_props_set: usize,
    /// New generation errors.
    pub errors_added: usize,
    /// Store version before the flush.
    pub version_before: u64,
    /// Store version after the flush.
    pub version_after: u64,
}

impl CommitReport {
    /// True when the flush published at least one new snapshot.
    pub fn applied(&self) -> bool {
        self.version_after != self.version_before
    }

    /// True when nothing was drained.
    pub fn is_empty(&self) -> bool {
        self.requests == 0
    }
}

/// Buffers mutation requests until [`flush`](Self::flush).
///
/// Generation units push requests from wherever they run; the scheduler calls
/// `flush` once per cycle. Each non-empty buffer becomes exactly one store call,
/// applied in this order:
///
/// 1. page additions
/// 2. node additions
/// 3. node removals
/// 4. node patches
/// 5. page patches
/// 6. errors
///
/// Removals run before patches, so a node removed in a cycle is never revived
/// by a patch from the same cycle (patches to missing nodes are dropped by the
/// store). Errors run last so they can land on nodes added in the same cycle.
#[derive(Debug)]
pub struct CommitQueue {
    add_pages: Vec<PageKey>,
    add_nodes: Vec<AddNodeRequest>,
    remove_nodes: Vec<RemoveNodeRequest>,
    set_node_props: Vec<SetNodePropRequest>,
    set_page_props: Vec<SetPagePropRequest>,
    errors: Vec<AddErrorRequest>,
    scheduled: bool,
    schedule_count: u64,
    pending_tx: watch::Sender<usize>,
    settle: SettleConfig,
}

impl Default for CommitQueue {
    fn default() -> Self {
        Self::new(SettleConfig::default())
    }
}

impl CommitQueue {
    /// Create an empty queue whose waiters use `settle` timing.
    pub fn new(settle: SettleConfig) -> Self {
        let (pending_tx, _) = watch::channel(0);
        Self {
            add_pages: Vec::new(),
            add_nodes: Vec::new(),
            remove_nodes: Vec::new(),
            set_node_props: Vec::new(),
            set_page_props: Vec::new(),
            errors: Vec::new(),
            scheduled: false,
            schedule_count: 0,
            pending_tx,
            settle,
        }
    }

    /// Queue a page addition.
    pub fn add_page(&mut self, page_key: PageKey) {
        self.add_pages.push(page_key);
        self.schedule();
    }

    /// Queue a node addition.
    pub fn add_node(&mut self, request: AddNodeRequest) {
        self.add_nodes.push(request);
        self.schedule();
    }

    /// Queue a node removal.
    pub fn remove_node(&mut self, request: RemoveNodeRequest) {
        self.remove_nodes.push(request);
        self.schedule();
    }

    /// Queue a node patch.
    pub fn set_node_prop(&mut self, request: SetNodePropRequest) {
        self.set_node_props.push(request);
        self.schedule();
    }

    /// Queue a page patch.
    pub fn set_page_prop(&mut self, request: SetPagePropRequest) {
        self.set_page_props.push(request);
        self.schedule();
    }

    /// Queue a generation error.
    pub fn add_error(&mut self, request: AddErrorRequest) {
        self.errors.push(request);
        self.schedule();
    }

    fn schedule(&mut self) {
        if !self.scheduled {
            self.scheduled = true;
            self.schedule_count += 1;
        }
        self.publish_pending();
    }

    fn publish_pending(&self) {
        let pending = self.pending();
        self.pending_tx.send_if_modified(|current| {
            if *current == pending {
                return false;
            }
            *current = pending;
            true
        });
    }

    /// Number of flushes scheduled so far.
    ///
    /// Pushing while a flush is already scheduled does not increment it, so a
    /// scheduler that watches this counter runs one flush per cycle.
    pub fn schedule_count(&self) -> u64 {
        self.schedule_count
    }

    /// True between the first push of a cycle and the flush that ends it.
    pub fn is_flush_scheduled(&self) -> bool {
        self.scheduled
    }

    /// Total buffered requests.
    pub fn pending(&self) -> usize {
        self.add_pages.len()
            + self.add_nodes.len()
            + self.remove_nodes.len()
            + self.set_node_props.len()
            + self.set_page_props.len()
            + self.errors.len()
    }

    /// True when every buffer is empty.
    pub fn is_settled(&self) -> bool {
        self.pending() == 0
    }

    /// A waiter that resolves when this queue drains.
    pub fn settle_handle(&self) -> SettleWaiter {
        SettleWaiter::new(self.pending_tx.subscribe(), self.settle)
    }

    /// Drain every buffer into `store`, one store call per non-empty buffer.
    #[instrument(skip_all, fields(pending = self.pending()))]
    pub fn flush(&mut self, store: &mut NodesStore) -> CommitReport {
        let mut report = CommitReport {
            requests: self.pending(),
            version_before: store.state().version(),
            ..CommitReport::default()
        };
        self.scheduled = false;
        if !self.add_pages.is_empty() {
            report.pages_added = store.add_pages(std::mem::take(&mut self.add_pages));
        }
        if !self.add_nodes.is_empty() {
            report.nodes_added = store.add_nodes(std::mem::take(&mut self.add_nodes));
        }
        if !self.remove_nodes.is_empty() {
            report.nodes_removed = store.remove_nodes(std::mem::take(&mut self.remove_nodes));
        }
        if !self.set_node_props.is_empty() {
            report.node_props_set = store.set_node_props(std::mem::take(&mut self.set_node_props));
        }
        if !self.set_page_props.is_empty() {
            report.page_props_set = store.set_page_props(std::mem::take(&mut self.set_page_props));
        }
        if !self.errors.is_empty() {
            report.errors_added = store.add_errors(std::mem::take(&mut self.errors));
        }
        report.version_after = store.state().version();
        self.publish_pending();
        debug!(?report, "flushed commit queue");
        report
    }
}
