// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generation stages.

use tracing::info;
use understory_node_store::{NodesStore, Readiness};

use crate::queue::CommitQueue;

/// Phases of one generation run, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Nodes are being materialized.
    AddNodes,
    /// Waiting for the first rule evaluation over the new nodes.
    MarkHidden,
    /// Option lists are being fetched.
    FetchOptions,
    /// Initial validation is running.
    FormValidation,
    /// Nothing left to do; the store is marked ready.
    Finished,
}

impl Stage {
    /// The stage after this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::AddNodes => Some(Self::MarkHidden),
            Self::MarkHidden => Some(Self::FetchOptions),
            Self::FetchOptions => Some(Self::FormValidation),
            Self::FormValidation => Some(Self::Finished),
            Self::Finished => None,
        }
    }
}

/// Numbered runs through [`Stage`]s.
///
/// [`tick`](Self::tick) moves one stage forward, but only once the commit
/// queue has settled; leaving [`Stage::MarkHidden`] also needs rule results.
/// Reaching [`Stage::Finished`] marks the store [`Readiness::Ready`].
#[derive(Clone, Debug)]
pub struct Stages {
    current: Stage,
    run: u32,
}

impl Default for Stages {
    fn default() -> Self {
        Self::new()
    }
}

impl Stages {
    /// Start run 1 at [`Stage::AddNodes`].
    pub fn new() -> Self {
        Self {
            current: Stage::AddNodes,
            run: 1,
        }
    }

    /// Current stage.
    pub fn current(&self) -> Stage {
        self.current
    }

    /// Current run number, starting at 1.
    pub fn run(&self) -> u32 {
        self.run
    }

    /// True once the current run has finished.
    pub fn is_finished(&self) -> bool {
        self.current == Stage::Finished
    }

    /// Try to advance one stage. Returns the new stage when it advanced.
    pub fn tick(&mut self, queue: &CommitQueue, store: &mut NodesStore) -> Option<Stage> {
        if !queue.is_settled() {
            return None;
        }
        if self.current == Stage::MarkHidden && !store.state().hidden_via_rules_ran() {
            return None;
        }
        let next = self.current.next()?;
        self.current = next;
        if next == Stage::Finished {
            store.mark_ready(Readiness::Ready);
            info!(run = self.run, "node generation finished");
        }
        Some(next)
    }

    /// Tick until no further progress is possible. Returns the final stage.
    pub fn settle(&mut self, queue: &CommitQueue, store: &mut NodesStore) -> Stage {
        while self.tick(queue, store).is_some() {}
        self.current
    }

    /// Begin a new run after new work arrived.
    ///
    /// A finished run restarts at [`Stage::AddNodes`] with the next run number;
    /// a run still in progress simply absorbs the new work. Returns true when a
    /// new run started.
    pub fn restart(&mut self) -> bool {
        if self.current != Stage::Finished {
            return false;
        }
        self.run += 1;
        self.current = Stage::AddNodes;
        true
    }
}
