// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout descriptions: pages of component declarations.
//!
//! A [`LayoutSet`] is the input to [`NodesStore::reset`](crate::NodesStore::reset) and to
//! the generation pass. It is immutable once built and shared by [`Arc`](std::sync::Arc);
//! the store detects layout swaps by pointer identity, never by content.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::id::PageKey;

/// Errors produced while parsing a layout description.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The input was not valid JSON, or a declaration had the wrong shape.
    #[error("malformed layout json: {0}")]
    Json(#[from] serde_json::Error),
    /// The top level must be an object mapping page keys to declaration lists.
    #[error("layout set must be an object of pages")]
    NotAnObject,
    /// A page entry was not a list of declarations.
    #[error("page `{page}` is not a list of components")]
    PageNotAList {
        /// Offending page key.
        page: String,
    },
    /// A declaration had an empty id.
    #[error("component on page `{page}` has an empty id")]
    EmptyId {
        /// Page the declaration sits on.
        page: String,
    },
}

/// A single component declaration.
///
/// Fields other than `id`, `type`, `repeating` and `children` are kept in
/// [`props`](Self::props) and seed the materialized node's `item`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentDecl {
    /// Stable component id; the base id of every node materialized from it.
    pub id: String,
    /// Component type tag.
    #[serde(rename = "type")]
    pub type_tag: String,
    /// True when this component is a repeating structure whose children are
    /// materialized once per row.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub repeating: bool,
    /// Nested declarations, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ComponentDecl>,
    /// Remaining declared properties.
    #[serde(flatten)]
    pub props: Map<String, Value>,
}

impl ComponentDecl {
    /// A plain (non-repeating) declaration with no children.
    pub fn new(id: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_tag: type_tag.into(),
            repeating: false,
            children: Vec::new(),
            props: Map::new(),
        }
    }

    /// Mark this declaration as a repeating structure.
    #[must_use]
    pub fn repeating(mut self) -> Self {
        self.repeating = true;
        self
    }

    /// Replace the children.
    #[must_use]
    pub fn with_children(mut self, children: Vec<Self>) -> Self {
        self.children = children;
        self
    }

    /// Add a declared property.
    #[must_use]
    pub fn with_prop(mut self, key: impl Into<String>, value: Value) -> Self {
        self.props.insert(key.into(), value);
        self
    }
}

/// Where a declaration sits in the layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeclInfo {
    /// Owning page.
    pub page: PageKey,
    /// Declaring parent's id, or `None` for a top-level component.
    pub parent: Option<String>,
    /// Index among the parent's (or page's) children.
    pub position: usize,
    /// Whether the declaration is a repeating structure.
    pub repeating: bool,
    /// Component type tag.
    pub type_tag: String,
    path: Vec<usize>,
}

/// A declaration that reused an id already declared elsewhere.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DuplicateDecl {
    /// The reused id.
    pub id: String,
    /// Page of the ignored declaration.
    pub page: PageKey,
}

/// An ordered set of pages, each an ordered tree of component declarations.
#[derive(Clone, Debug, Default)]
pub struct LayoutSet {
    pages: Vec<(PageKey, Vec<ComponentDecl>)>,
    index: FxHashMap<String, DeclInfo>,
    duplicates: Vec<DuplicateDecl>,
}

impl LayoutSet {
    /// Build a layout set from pages in order.
    ///
    /// Duplicate component ids are tolerated: the first declaration wins and
    /// the rest are reported by [`duplicates`](Self::duplicates).
    pub fn new(pages: impl IntoIterator<Item = (PageKey, Vec<ComponentDecl>)>) -> Self {
        let mut set = Self {
            pages: pages.into_iter().collect(),
            index: FxHashMap::default(),
            duplicates: Vec::new(),
        };
        let mut index = FxHashMap::default();
        let mut duplicates = Vec::new();
        for (key, decls) in &set.pages {
            index_level(key, None, decls, &mut Vec::new(), &mut index, &mut duplicates);
        }
        set.index = index;
        set.duplicates = duplicates;
        set
    }

    /// Parse a layout set from JSON of the form `{ "<page>": [ <component>, ... ], ... }`.
    ///
    /// Page order follows the order of keys in the input.
    pub fn from_json(input: &str) -> Result<Self, LayoutError> {
        let Value::Object(raw) = serde_json::from_str::<Value>(input)? else {
            return Err(LayoutError::NotAnObject);
        };
        let mut pages = Vec::with_capacity(raw.len());
        for (page, value) in raw {
            if !value.is_array() {
                return Err(LayoutError::PageNotAList { page });
            }
            let decls: Vec<ComponentDecl> = serde_json::from_value(value)?;
            if has_empty_id(&decls) {
                return Err(LayoutError::EmptyId { page });
            }
            pages.push((PageKey::from(page), decls));
        }
        Ok(Self::new(pages))
    }

    /// Page keys in declaration order.
    pub fn page_keys(&self) -> impl Iterator<Item = &PageKey> + '_ {
        self.pages.iter().map(|(k, _)| k)
    }

    /// Pages with their top-level declarations, in order.
    pub fn pages(&self) -> impl Iterator<Item = (&PageKey, &[ComponentDecl])> + '_ {
        self.pages.iter().map(|(k, d)| (k, d.as_slice()))
    }

    /// Top-level declarations of a page.
    pub fn page(&self, key: &str) -> Option<&[ComponentDecl]> {
        self.pages
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, d)| d.as_slice())
    }

    /// Position of a page in declaration order.
    pub fn page_position(&self, key: &str) -> Option<usize> {
        self.pages.iter().position(|(k, _)| k.as_str() == key)
    }

    /// Placement of a declaration by component id.
    pub fn info(&self, id: &str) -> Option<&DeclInfo> {
        self.index.get(id)
    }

    /// The declaration for a component id.
    pub fn decl(&self, id: &str) -> Option<&ComponentDecl> {
        let info = self.index.get(id)?;
        let page = self.page(info.page.as_str())?;
        let (first, rest) = info.path.split_first()?;
        let mut decl = page.get(*first)?;
        for step in rest {
            decl = decl.children.get(*step)?;
        }
        Some(decl)
    }

    /// Declarations ignored because their id was already taken.
    pub fn duplicates(&self) -> &[DuplicateDecl] {
        &self.duplicates
    }

    /// Number of distinct component ids.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when no page declares any component.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

fn index_level(
    page: &PageKey,
    parent: Option<&str>,
    decls: &[ComponentDecl],
    path: &mut Vec<usize>,
    index: &mut FxHashMap<String, DeclInfo>,
    duplicates: &mut Vec<DuplicateDecl>,
) {
    for (position, decl) in decls.iter().enumerate() {
        path.push(position);
        if index.contains_key(&decl.id) {
            duplicates.push(DuplicateDecl {
                id: decl.id.clone(),
                page: page.clone(),
            });
        } else {
            index.insert(
                decl.id.clone(),
                DeclInfo {
                    page: page.clone(),
                    parent: parent.map(str::to_owned),
                    position,
                    repeating: decl.repeating,
                    type_tag: decl.type_tag.clone(),
                    path: path.clone(),
                },
            );
            index_level(page, Some(&decl.id), &decl.children, path, index, duplicates);
        }
        path.pop();
    }
}

fn has_empty_id(decls: &[ComponentDecl]) -> bool {
    decls
        .iter()
        .any(|d| d.id.is_empty() || has_empty_id(&d.children))
}
