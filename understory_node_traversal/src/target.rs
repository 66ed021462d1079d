// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dynamic dispatch over root, page and node views.

use std::fmt;

use thiserror::Error;

use crate::matcher::{Candidate, Filter};
use crate::views::{NodeView, PageView, RootView};

/// Kind of traversal target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// The page set.
    Root,
    /// A single page.
    Page,
    /// A single node.
    Node,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Root => "root",
            Self::Page => "page",
            Self::Node => "node",
        })
    }
}

/// Calling an operation on a target that does not support it.
///
/// These are caller bugs, not data conditions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraversalError {
    /// Ancestor operations need a node.
    #[error("`{op}` needs a node target, called on {target}")]
    RequiresNode {
        /// Operation name.
        op: &'static str,
        /// Target it was called on.
        target: TargetKind,
    },
    /// Page-set operations need the root.
    #[error("`{op}` is only available on the root, called on {target}")]
    RequiresRoot {
        /// Operation name.
        op: &'static str,
        /// Target it was called on.
        target: TargetKind,
    },
}

/// Any traversal target.
///
/// Typed views make misuse impossible; this wrapper is for call sites that
/// hold an arbitrary target and turns misuse into [`TraversalError`].
#[derive(Clone, Copy, Debug)]
pub enum TargetView<'a> {
    /// The page set.
    Root(RootView<'a>),
    /// A page.
    Page(PageView<'a>),
    /// A node.
    Node(NodeView<'a>),
}

impl<'a> From<RootView<'a>> for TargetView<'a> {
    fn from(view: RootView<'a>) -> Self {
        Self::Root(view)
    }
}

impl<'a> From<PageView<'a>> for TargetView<'a> {
    fn from(view: PageView<'a>) -> Self {
        Self::Page(view)
    }
}

impl<'a> From<NodeView<'a>> for TargetView<'a> {
    fn from(view: NodeView<'a>) -> Self {
        Self::Node(view)
    }
}

impl<'a> TargetView<'a> {
    /// What kind of target this is.
    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Root(_) => TargetKind::Root,
            Self::Page(_) => TargetKind::Page,
            Self::Node(_) => TargetKind::Node,
        }
    }

    fn node(&self, op: &'static str) -> Result<&NodeView<'a>, TraversalError> {
        match self {
            Self::Node(node) => Ok(node),
            _ => Err(TraversalError::RequiresNode {
                op,
                target: self.kind(),
            }),
        }
    }

    fn root(&self, op: &'static str) -> Result<&RootView<'a>, TraversalError> {
        match self {
            Self::Root(root) => Ok(root),
            _ => Err(TraversalError::RequiresRoot {
                op,
                target: self.kind(),
            }),
        }
    }

    /// See [`NodeView::parents`].
    pub fn parents(&self, filter: Filter<'_>) -> Result<Vec<Candidate<'a>>, TraversalError> {
        Ok(self.node("parents")?.parents(filter))
    }

    /// See [`NodeView::closest`].
    pub fn closest(&self, filter: Filter<'_>) -> Result<Option<Candidate<'a>>, TraversalError> {
        Ok(self.node("closest")?.closest(filter))
    }

    /// See [`RootView::all_nodes`].
    pub fn all_nodes(&self) -> Result<Vec<NodeView<'a>>, TraversalError> {
        Ok(self.root("all_nodes")?.all_nodes())
    }

    /// See [`RootView::find_page`].
    pub fn find_page(&self, key: &str) -> Result<Option<PageView<'a>>, TraversalError> {
        Ok(self.root("find_page")?.find_page(key))
    }

    /// Direct children of any target.
    pub fn children(&self, filter: Filter<'_>) -> Vec<NodeView<'a>> {
        match self {
            Self::Root(root) => root.children(filter),
            Self::Page(page) => page.children(filter),
            Self::Node(node) => node.children(filter),
        }
    }

    /// First direct child of any target.
    pub fn first_child(&self, filter: Filter<'_>) -> Option<NodeView<'a>> {
        self.children(filter).into_iter().next()
    }

    /// Depth-first descendants of any target.
    pub fn flat(&self, filter: Filter<'_>) -> Vec<NodeView<'a>> {
        match self {
            Self::Root(root) => root.flat(filter),
            Self::Page(page) => page.flat(filter),
            Self::Node(node) => node.flat(filter),
        }
    }

    /// Id lookup from any target.
    pub fn find_by_id(&self, id: &str) -> Option<NodeView<'a>> {
        match self {
            Self::Root(root) => root.find_by_id(id),
            Self::Page(page) => page.find_by_id(id),
            Self::Node(node) => node.find_by_id(id),
        }
    }

    /// Multi-match id lookup from any target.
    pub fn find_all_by_id(&self, id: &str) -> Vec<NodeView<'a>> {
        match self {
            Self::Root(root) => root.find_all_by_id(id),
            Self::Page(page) => page.find_all_by_id(id),
            Self::Node(node) => node.find_all_by_id(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use understory_node_store::{LayoutSet, NodesStore, PageKey, ResetSeed};

    #[test]
    fn misuse_is_reported() {
        let mut store = NodesStore::default();
        store.reset(
            Arc::new(LayoutSet::new([(PageKey::from("P"), vec![])])),
            ResetSeed::default(),
        );
        let root = RootView::new(store.state());
        let page = TargetView::from(root.find_page("P").unwrap());
        assert_eq!(
            page.parents(Filter::all()).unwrap_err(),
            TraversalError::RequiresNode {
                op: "parents",
                target: TargetKind::Page,
            }
        );
        assert!(matches!(
            TargetView::from(root).closest(Filter::all()),
            Err(TraversalError::RequiresNode { target: TargetKind::Root, .. })
        ));
        assert!(matches!(
            page.all_nodes(),
            Err(TraversalError::RequiresRoot { op: "all_nodes", .. })
        ));
        assert!(TargetView::from(root).find_page("P").unwrap().is_some());
        assert_eq!(
            page.find_page("P").unwrap_err().to_string(),
            "`find_page` is only available on the root, called on page"
        );
    }
}
