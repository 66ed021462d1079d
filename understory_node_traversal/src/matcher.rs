// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Candidates, matchers, restrictions, and the filter that bundles them.

use understory_node_store::{NodeId, NodeRecord, NodesState, PageRecord, RowId};

/// A page or node offered to a [`Matcher`].
#[derive(Clone, Copy, Debug)]
pub enum Candidate<'a> {
    /// A page record.
    Page(&'a PageRecord),
    /// A node record with its id.
    Node {
        /// Node id.
        id: &'a NodeId,
        /// Node record.
        record: &'a NodeRecord,
    },
}

impl<'a> Candidate<'a> {
    /// Page key or rendered node id.
    pub fn id(&self) -> &'a str {
        match self {
            Self::Page(page) => page.page_key.as_str(),
            Self::Node { id, .. } => id.as_str(),
        }
    }

    /// Component type tag; `None` for pages.
    pub fn type_tag(&self) -> Option<&'a str> {
        match self {
            Self::Page(_) => None,
            Self::Node { record, .. } => Some(record.type_tag.as_str()),
        }
    }

    /// The node, if this is a node.
    pub fn as_node(&self) -> Option<(&'a NodeId, &'a NodeRecord)> {
        match *self {
            Self::Page(_) => None,
            Self::Node { id, record } => Some((id, record)),
        }
    }

    /// The page, if this is a page.
    pub fn as_page(&self) -> Option<&'a PageRecord> {
        match *self {
            Self::Page(page) => Some(page),
            Self::Node { .. } => None,
        }
    }
}

/// Predicate over candidates.
///
/// `Some(true)`/`Some(false)` decide; `None` means the matcher does not apply
/// and the operation's default is used. Walks that collect (`children`, `flat`,
/// `parents`) default to including; searches (`closest`) default to skipping.
pub trait Matcher {
    /// Decide whether `candidate` matches.
    fn matches(&self, state: &NodesState, candidate: &Candidate<'_>) -> Option<bool>;
}

impl<F> Matcher for F
where
    F: Fn(&NodesState, &Candidate<'_>) -> Option<bool>,
{
    fn matches(&self, state: &NodesState, candidate: &Candidate<'_>) -> Option<bool> {
        self(state, candidate)
    }
}

/// Matches nodes of one component type. Not applicable to pages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeIs(pub String);

impl Matcher for TypeIs {
    fn matches(&self, _state: &NodesState, candidate: &Candidate<'_>) -> Option<bool> {
        candidate.type_tag().map(|t| t == self.0)
    }
}

/// Matches nodes materialized from a repeating declaration. Not applicable to pages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IsRepeating;

impl Matcher for IsRepeating {
    fn matches(&self, state: &NodesState, candidate: &Candidate<'_>) -> Option<bool> {
        let (id, _) = candidate.as_node()?;
        let layouts = state.layouts()?;
        Some(layouts.info(id.base()).is_some_and(|info| info.repeating))
    }
}

/// Matches nodes by full or base id, and pages by key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HasId(pub String);

impl Matcher for HasId {
    fn matches(&self, _state: &NodesState, candidate: &Candidate<'_>) -> Option<bool> {
        Some(match candidate {
            Candidate::Page(page) => page.page_key.as_str() == self.0,
            Candidate::Node { id, .. } => id.matches(&self.0),
        })
    }
}

/// Row filter applied to the first level of `children`/`flat` results.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Restriction {
    /// Display-order row index of the innermost enclosing repeating structure.
    Index(usize),
    /// Stable row id of the innermost enclosing repeating structure.
    Row(RowId),
}

impl Restriction {
    /// True when the node lives in the restricted row.
    pub fn admits(&self, id: &NodeId, record: &NodeRecord) -> bool {
        match self {
            Self::Index(index) => id.innermost_row() == Some(*index),
            Self::Row(row_id) => record.row.as_ref().is_some_and(|r| r.row_id == *row_id),
        }
    }
}

impl From<usize> for Restriction {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<RowId> for Restriction {
    fn from(row_id: RowId) -> Self {
        Self::Row(row_id)
    }
}

/// Optional matcher plus optional restriction.
///
/// ```
/// use understory_node_traversal::{Filter, TypeIs};
///
/// let inputs = TypeIs("Input".into());
/// let filter = Filter::matching(&inputs).in_row(0);
/// assert!(filter.restriction().is_some());
/// ```
#[derive(Clone, Copy, Default)]
pub struct Filter<'m> {
    matcher: Option<&'m dyn Matcher>,
    restriction: Option<&'m Restriction>,
    row: Option<usize>,
}

impl std::fmt::Debug for Filter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter")
            .field("matcher", &self.matcher.is_some())
            .field("restriction", &self.restriction())
            .finish()
    }
}

impl<'m> Filter<'m> {
    /// No matcher, no restriction.
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter by `matcher`.
    pub fn matching(matcher: &'m dyn Matcher) -> Self {
        Self {
            matcher: Some(matcher),
            ..Self::default()
        }
    }

    /// Restrict the first level to row `index`.
    #[must_use]
    pub fn in_row(mut self, index: usize) -> Self {
        self.row = Some(index);
        self.restriction = None;
        self
    }

    /// Restrict the first level by an arbitrary restriction.
    #[must_use]
    pub fn restricted(mut self, restriction: &'m Restriction) -> Self {
        self.restriction = Some(restriction);
        self.row = None;
        self
    }

    /// The active restriction.
    pub fn restriction(&self) -> Option<Restriction> {
        match (self.restriction, self.row) {
            (Some(r), _) => Some(r.clone()),
            (None, Some(index)) => Some(Restriction::Index(index)),
            (None, None) => None,
        }
    }

    pub(crate) fn admits_row(&self, id: &NodeId, record: &NodeRecord) -> bool {
        match (self.restriction, self.row) {
            (Some(r), _) => r.admits(id, record),
            (None, Some(index)) => id.innermost_row() == Some(index),
            (None, None) => true,
        }
    }

    pub(crate) fn test(&self, state: &NodesState, candidate: &Candidate<'_>, default: bool) -> bool {
        self.matcher
            .and_then(|m| m.matches(state, candidate))
            .unwrap_or(default)
    }

    pub(crate) fn without_restriction(self) -> Self {
        Self {
            matcher: self.matcher,
            restriction: None,
            row: None,
        }
    }
}
