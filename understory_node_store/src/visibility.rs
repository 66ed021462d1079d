// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hidden-state queries combining expression flags, rule results and ancestry.

use crate::id::{NodeId, PageKey, ParentRef};
use crate::record::HiddenFlags;
use crate::store::NodesState;

/// Options for hidden-state queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VisibilityOptions {
    /// Treat pages excluded from the navigation order as hidden.
    pub respect_tracks: bool,
}

impl NodesState {
    /// True when the rule map hides `id`, checked by full id and then base id.
    pub fn is_hidden_via_rule(&self, id: &NodeId) -> bool {
        let rules = self.hidden_via_rules();
        rules.contains(id.as_str()) || rules.contains(id.base())
    }

    /// True when a page is hidden.
    ///
    /// Unknown pages are reported as visible.
    pub fn is_page_hidden(&self, key: &str, options: VisibilityOptions) -> bool {
        let Some(page) = self.page(key) else {
            return false;
        };
        let mut flags = HiddenFlags::EXPRESSION;
        if options.respect_tracks {
            flags |= HiddenFlags::TRACKS;
        }
        page.hidden.intersects(flags)
    }

    /// True when a node, any of its ancestors, or its page is hidden.
    ///
    /// Unknown nodes are reported as visible.
    pub fn is_hidden(&self, id: &str, options: VisibilityOptions) -> bool {
        let mut current = self.node_id(id);
        while let Some(id) = current {
            let Some(record) = self.node(id.as_str()) else {
                return false;
            };
            if record.hidden.contains(HiddenFlags::EXPRESSION) || self.is_hidden_via_rule(id) {
                return true;
            }
            current = match &record.parent {
                ParentRef::Node(parent) => Some(parent),
                ParentRef::Page(page) => return self.is_page_hidden(page.as_str(), options),
            };
        }
        false
    }

    /// Keys of hidden pages, in page order.
    pub fn hidden_pages(&self, options: VisibilityOptions) -> Vec<PageKey> {
        self.pages()
            .filter(|p| self.is_page_hidden(p.page_key.as_str(), options))
            .map(|p| p.page_key.clone())
            .collect()
    }
}
