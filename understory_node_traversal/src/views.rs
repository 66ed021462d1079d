// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed views over a snapshot: the page set, one page, one node.

use understory_node_store::{
    NodeId, NodeRecord, NodesState, PageKey, PageRecord, ParentRef, VisibilityOptions,
};

use crate::matcher::{Candidate, Filter};

/// A node seen through a snapshot.
#[derive(Clone, Copy, Debug)]
pub struct NodeView<'a> {
    state: &'a NodesState,
    id: &'a NodeId,
    record: &'a NodeRecord,
}

/// A page seen through a snapshot.
#[derive(Clone, Copy, Debug)]
pub struct PageView<'a> {
    state: &'a NodesState,
    page: &'a PageRecord,
}

/// Every page of a snapshot.
#[derive(Clone, Copy, Debug)]
pub struct RootView<'a> {
    state: &'a NodesState,
}

impl<'a> RootView<'a> {
    /// View the whole snapshot.
    pub fn new(state: &'a NodesState) -> Self {
        Self { state }
    }

    /// The underlying snapshot.
    pub fn state(&self) -> &'a NodesState {
        self.state
    }

    /// Page by key.
    pub fn find_page(&self, key: &str) -> Option<PageView<'a>> {
        self.state.page(key).map(|page| PageView {
            state: self.state,
            page,
        })
    }

    /// Pages in order.
    pub fn pages(&self) -> Vec<PageView<'a>> {
        self.state
            .pages()
            .map(|page| PageView {
                state: self.state,
                page,
            })
            .collect()
    }

    /// Node by exact id.
    pub fn node(&self, id: &str) -> Option<NodeView<'a>> {
        node_view(self.state, id)
    }

    /// Top-level nodes of every page, in page order.
    pub fn children(&self, filter: Filter<'_>) -> Vec<NodeView<'a>> {
        self.pages()
            .iter()
            .flat_map(|page| page.children(filter))
            .collect()
    }

    /// Every node, depth-first, page by page.
    pub fn flat(&self, filter: Filter<'_>) -> Vec<NodeView<'a>> {
        self.pages()
            .iter()
            .flat_map(|page| page.flat(filter))
            .collect()
    }

    /// Every node of every page.
    pub fn all_nodes(&self) -> Vec<NodeView<'a>> {
        self.flat(Filter::all())
    }

    /// Exact id match, else the first node (in [`flat`](Self::flat) order) with that base id.
    pub fn find_by_id(&self, id: &str) -> Option<NodeView<'a>> {
        self.node(id)
            .or_else(|| self.find_all_by_id(id).into_iter().next())
    }

    /// Every node whose full or base id is `id`, in [`flat`](Self::flat) order.
    pub fn find_all_by_id(&self, id: &str) -> Vec<NodeView<'a>> {
        self.all_nodes()
            .into_iter()
            .filter(|n| n.id.matches(id))
            .collect()
    }

    /// Keys of hidden pages.
    pub fn hidden_pages(&self, options: VisibilityOptions) -> Vec<PageKey> {
        self.state.hidden_pages(options)
    }
}

impl<'a> PageView<'a> {
    /// Page key.
    pub fn key(&self) -> &'a PageKey {
        &self.page.page_key
    }

    /// Page record.
    pub fn record(&self) -> &'a PageRecord {
        self.page
    }

    /// This page as a matcher candidate.
    pub fn candidate(&self) -> Candidate<'a> {
        Candidate::Page(self.page)
    }

    /// The root view of the same snapshot.
    pub fn root(&self) -> RootView<'a> {
        RootView::new(self.state)
    }

    /// Top-level nodes of this page.
    pub fn children(&self, filter: Filter<'_>) -> Vec<NodeView<'a>> {
        children(self.state, &ParentRef::Page(self.page.page_key.clone()), filter)
    }

    /// First top-level node passing `filter`.
    pub fn first_child(&self, filter: Filter<'_>) -> Option<NodeView<'a>> {
        self.children(filter).into_iter().next()
    }

    /// Every node on this page, depth-first.
    pub fn flat(&self, filter: Filter<'_>) -> Vec<NodeView<'a>> {
        flat(self.state, &ParentRef::Page(self.page.page_key.clone()), filter)
    }

    /// Exact id on this page, else the first node on this page with that base id.
    pub fn find_by_id(&self, id: &str) -> Option<NodeView<'a>> {
        if let Some(node) = node_view(self.state, id)
            && node.record.page == self.page.page_key
        {
            return Some(node);
        }
        self.find_all_by_id(id).into_iter().next()
    }

    /// Every node on this page whose full or base id is `id`.
    pub fn find_all_by_id(&self, id: &str) -> Vec<NodeView<'a>> {
        self.flat(Filter::all())
            .into_iter()
            .filter(|n| n.id.matches(id))
            .collect()
    }

    /// True when the page is hidden.
    pub fn is_hidden(&self, options: VisibilityOptions) -> bool {
        self.state
            .is_page_hidden(self.page.page_key.as_str(), options)
    }
}

impl<'a> NodeView<'a> {
    /// Node id.
    pub fn id(&self) -> &'a NodeId {
        self.id
    }

    /// Node record.
    pub fn record(&self) -> &'a NodeRecord {
        self.record
    }

    /// This node as a matcher candidate.
    pub fn candidate(&self) -> Candidate<'a> {
        Candidate::Node {
            id: self.id,
            record: self.record,
        }
    }

    /// The root view of the same snapshot.
    pub fn root(&self) -> RootView<'a> {
        RootView::new(self.state)
    }

    /// The page this node is on.
    pub fn page(&self) -> Option<PageView<'a>> {
        self.root().find_page(self.record.page.as_str())
    }

    /// Direct parent: a node, or the page for top-level nodes.
    pub fn parent(&self) -> Option<Candidate<'a>> {
        match &self.record.parent {
            ParentRef::Node(id) => node_view(self.state, id.as_str()).map(|n| n.candidate()),
            ParentRef::Page(key) => self.state.page(key.as_str()).map(Candidate::Page),
        }
    }

    /// Ancestors nearest first, ending with the page, filtered by `filter`'s matcher.
    pub fn parents(&self, filter: Filter<'_>) -> Vec<Candidate<'a>> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(candidate) = current {
            if filter.test(self.state, &candidate, true) {
                out.push(candidate);
            }
            current = match candidate {
                Candidate::Node { id, record } => NodeView {
                    state: self.state,
                    id,
                    record,
                }
                .parent(),
                Candidate::Page(_) => None,
            };
        }
        out
    }

    /// This node, else the nearest ancestor, else the page, that `filter`'s matcher accepts.
    pub fn closest(&self, filter: Filter<'_>) -> Option<Candidate<'a>> {
        let own = self.candidate();
        if filter.test(self.state, &own, false) {
            return Some(own);
        }
        let mut current = self.parent();
        while let Some(candidate) = current {
            if filter.test(self.state, &candidate, false) {
                return Some(candidate);
            }
            current = match candidate {
                Candidate::Node { id, record } => NodeView {
                    state: self.state,
                    id,
                    record,
                }
                .parent(),
                Candidate::Page(_) => None,
            };
        }
        None
    }

    /// Direct children.
    pub fn children(&self, filter: Filter<'_>) -> Vec<NodeView<'a>> {
        children(self.state, &ParentRef::Node(self.id.clone()), filter)
    }

    /// First direct child passing `filter`.
    pub fn first_child(&self, filter: Filter<'_>) -> Option<NodeView<'a>> {
        self.children(filter).into_iter().next()
    }

    /// Every descendant, depth-first.
    pub fn flat(&self, filter: Filter<'_>) -> Vec<NodeView<'a>> {
        flat(self.state, &ParentRef::Node(self.id.clone()), filter)
    }

    /// Resolve `id` from this node's point of view.
    ///
    /// An exact id wins. Otherwise, among nodes with that base id, the one
    /// sharing the longest row path with this node (the "same row") wins;
    /// ties go to the earliest in traversal order.
    pub fn find_by_id(&self, id: &str) -> Option<NodeView<'a>> {
        if let Some(node) = node_view(self.state, id) {
            return Some(node);
        }
        let mut best: Option<(usize, NodeView<'a>)> = None;
        for node in self.root().find_all_by_id(id) {
            let shared = node.id.shared_rows(self.id);
            if best.as_ref().is_none_or(|(score, _)| shared > *score) {
                best = Some((shared, node));
            }
        }
        best.map(|(_, node)| node)
    }

    /// Every descendant whose full or base id is `id`.
    pub fn find_all_by_id(&self, id: &str) -> Vec<NodeView<'a>> {
        self.flat(Filter::all())
            .into_iter()
            .filter(|n| n.id.matches(id))
            .collect()
    }

    /// True when this node, an ancestor, or its page is hidden.
    pub fn is_hidden(&self, options: VisibilityOptions) -> bool {
        self.state.is_hidden(self.id.as_str(), options)
    }
}

fn node_view<'a>(state: &'a NodesState, id: &str) -> Option<NodeView<'a>> {
    let id = state.node_id(id)?;
    let record = state.node(id.as_str())?;
    Some(NodeView { state, id, record })
}

fn children<'a>(state: &'a NodesState, parent: &ParentRef, filter: Filter<'_>) -> Vec<NodeView<'a>> {
    state
        .children_of(parent)
        .iter()
        .filter_map(|id| node_view(state, id.as_str()))
        .filter(|n| filter.admits_row(n.id, n.record))
        .filter(|n| filter.test(state, &n.candidate(), true))
        .collect()
}

fn flat<'a>(state: &'a NodesState, parent: &ParentRef, filter: Filter<'_>) -> Vec<NodeView<'a>> {
    let deeper = filter.without_restriction();
    let mut out = Vec::new();
    // Explicit stack of pending siblings, reversed so pops come out in order.
    let mut stack: Vec<NodeView<'a>> = state
        .children_of(parent)
        .iter()
        .rev()
        .filter_map(|id| node_view(state, id.as_str()))
        .filter(|n| filter.admits_row(n.id, n.record))
        .collect();
    while let Some(node) = stack.pop() {
        if deeper.test(state, &node.candidate(), true) {
            out.push(node);
        }
        stack.extend(
            state
                .children_of(&ParentRef::Node(node.id.clone()))
                .iter()
                .rev()
                .filter_map(|id| node_view(state, id.as_str())),
        );
    }
    out
}
