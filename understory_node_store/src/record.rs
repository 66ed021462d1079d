// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node and page records held by the store.

use serde_json::{Map, Value};

use crate::id::{PageKey, ParentRef, RowDescriptor};

bitflags::bitflags! {
    /// Non-rule hiding sources.
    ///
    /// Rule-driven hiding is kept separately in the store's hidden-via-rule map.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct HiddenFlags: u8 {
        /// Hidden by the component's own `hidden` expression.
        const EXPRESSION = 0b0000_0001;
        /// Hidden because the page is excluded from the navigation order.
        const TRACKS     = 0b0000_0010;
    }
}

/// Ordered set of generation error messages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneratorErrors(Vec<String>);

impl GeneratorErrors {
    /// Record `message`; returns false when it was already present.
    pub fn insert(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        if self.0.contains(&message) {
            return false;
        }
        self.0.push(message);
        true
    }

    /// True when `message` was recorded.
    pub fn contains(&self, message: &str) -> bool {
        self.0.iter().any(|m| m == message)
    }

    /// Messages in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(String::as_str)
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A materialized component instance.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeRecord {
    /// Component type tag.
    pub type_tag: String,
    /// Page the node lives on.
    pub page: PageKey,
    /// Structural parent.
    pub parent: ParentRef,
    /// Resolved (expression-evaluated) properties.
    pub item: Value,
    /// Position inside the nearest enclosing repeating structure.
    pub row: Option<RowDescriptor>,
    /// Expression-driven hiding.
    pub hidden: HiddenFlags,
    /// Generation errors, created on first error.
    pub errors: Option<GeneratorErrors>,
    /// Plugin-contributed state slices, keyed by field name.
    pub plugins: Map<String, Value>,
}

impl NodeRecord {
    /// A record with an empty item directly under `parent`.
    pub fn new(type_tag: impl Into<String>, page: PageKey, parent: ParentRef) -> Self {
        Self {
            type_tag: type_tag.into(),
            page,
            parent,
            item: Value::Object(Map::new()),
            row: None,
            hidden: HiddenFlags::empty(),
            errors: None,
            plugins: Map::new(),
        }
    }

    /// Replace the resolved item.
    #[must_use]
    pub fn with_item(mut self, item: Value) -> Self {
        self.item = item;
        self
    }

    /// Set the row descriptor.
    #[must_use]
    pub fn with_row(mut self, row: RowDescriptor) -> Self {
        self.row = Some(row);
        self
    }

    /// A plugin field, if present.
    pub fn plugin(&self, field: &str) -> Option<&Value> {
        self.plugins.get(field)
    }

    /// True when any generation error was recorded for this node.
    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }
}

/// A page of the active layout set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRecord {
    /// Page key.
    pub page_key: PageKey,
    /// Page-level hiding.
    pub hidden: HiddenFlags,
    /// Generation errors, created on first error.
    pub errors: Option<GeneratorErrors>,
}

impl PageRecord {
    /// An empty, visible page.
    pub fn new(page_key: PageKey) -> Self {
        Self {
            page_key,
            hidden: HiddenFlags::empty(),
            errors: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_errors_are_a_set() {
        let mut errors = GeneratorErrors::default();
        assert!(errors.insert("first"));
        assert!(errors.insert("second"));
        assert!(!errors.insert("first"));
        assert_eq!(errors.iter().collect::<Vec<_>>(), ["first", "second"]);
        assert!(errors.contains("second"));
    }

    #[test]
    fn new_node_has_no_errors() {
        let record = NodeRecord::new("Input", PageKey::from("P"), ParentRef::Page(PageKey::from("P")));
        assert!(!record.has_errors());
        assert!(record.item.as_object().is_some_and(Map::is_empty));
        assert!(record.hidden.is_empty());
    }
}
