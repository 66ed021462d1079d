// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identity types: page keys, node ids, row descriptors, and parent references.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Key of a page within a layout set.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageKey(Arc<str>);

impl PageKey {
    /// Create a page key.
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageKey({:?})", &*self.0)
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PageKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PageKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PageKey {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

/// Identifier for a node in the store.
///
/// A node id is the component's base id (as declared in the layout) followed by
/// the row index of every enclosing repeating structure, outermost first.
/// The rendered form joins the parts with `-`: `D` outside any repeating
/// structure, `D-1` in row 1, `E-0-2` in row 2 of a structure nested in row 0.
///
/// ## Semantics
///
/// - Two rows of the same repeating structure never render to the same id,
///   because their row paths differ in the last position.
/// - Equality, ordering, and hashing use the rendered form only. This makes
///   `NodeId` usable as a map key that can be looked up with a plain `&str`.
/// - The row path records display order (row *index*), not the stable
///   [`RowId`]. Reordering rows therefore changes ids; callers that need to
///   follow a row across reorders should track [`RowDescriptor::row_id`].
#[derive(Clone)]
pub struct NodeId {
    full: Arc<str>,
    base_len: usize,
    row_path: Arc<[usize]>,
}

impl NodeId {
    /// Id of a component outside any repeating structure.
    pub fn new(base: impl AsRef<str>) -> Self {
        Self::with_rows(base, &[])
    }

    /// Id of `base` inside the given chain of repeating rows (outermost first).
    pub fn with_rows(base: impl AsRef<str>, row_path: &[usize]) -> Self {
        let base = base.as_ref();
        let mut full = String::with_capacity(base.len() + row_path.len() * 3);
        full.push_str(base);
        for index in row_path {
            full.push('-');
            full.push_str(&index.to_string());
        }
        Self {
            full: Arc::from(full),
            base_len: base.len(),
            row_path: Arc::from(row_path),
        }
    }

    /// Id for a child component declared under this node.
    ///
    /// `row` is the row of this node the child lives in, and must be `Some`
    /// exactly when this node is a repeating structure.
    pub fn child(&self, child_base: impl AsRef<str>, row: Option<usize>) -> Self {
        match row {
            Some(index) => {
                let mut path = self.row_path.to_vec();
                path.push(index);
                Self::with_rows(child_base, &path)
            }
            None => Self::with_rows(child_base, &self.row_path),
        }
    }

    /// The rendered id.
    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// The component id this node was materialized from.
    pub fn base(&self) -> &str {
        &self.full[..self.base_len]
    }

    /// Row indices of every enclosing repeating structure, outermost first.
    pub fn row_path(&self) -> &[usize] {
        &self.row_path
    }

    /// Row index inside the nearest enclosing repeating structure.
    pub fn innermost_row(&self) -> Option<usize> {
        self.row_path.last().copied()
    }

    /// True when `id` names this node either exactly or by its base id.
    pub fn matches(&self, id: &str) -> bool {
        self.as_str() == id || self.base() == id
    }

    /// Length of the common row-path prefix shared with `other`.
    pub fn shared_rows(&self, other: &Self) -> usize {
        self.row_path
            .iter()
            .zip(other.row_path.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }
}

impl PartialEq for NodeId {
    fn eq(&self, other: &Self) -> bool {
        self.full == other.full
    }
}

impl Eq for NodeId {}

impl PartialOrd for NodeId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.full.cmp(&other.full)
    }
}

impl Hash for NodeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must agree with `str`'s hash for the `Borrow<str>` impl.
        self.as_str().hash(state);
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({:?})", self.as_str())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identifier of a row in a repeating structure.
///
/// Unlike [`RowDescriptor::index`], this survives insertion, deletion, and
/// reordering of sibling rows.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(Arc<str>);

impl RowId {
    /// Create a row id.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position of a node inside its nearest enclosing repeating structure.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RowDescriptor {
    /// Display-order index; recomputed whenever siblings change.
    pub index: usize,
    /// Reorder-stable identifier.
    pub row_id: RowId,
}

impl RowDescriptor {
    /// Create a row descriptor.
    pub fn new(index: usize, row_id: impl Into<RowId>) -> Self {
        Self {
            index,
            row_id: row_id.into(),
        }
    }
}

/// Parent of a node record: either the page it sits on, or another node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParentRef {
    /// The node is a top-level component of this page.
    Page(PageKey),
    /// The node is declared under this node.
    Node(NodeId),
}

impl ParentRef {
    /// The parent node id, if the parent is a node.
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            Self::Node(id) => Some(id),
            Self::Page(_) => None,
        }
    }
}
