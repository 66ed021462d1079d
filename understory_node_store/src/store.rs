// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The node data store: versioned snapshots and batch mutations.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::id::{NodeId, PageKey, ParentRef, RowDescriptor};
use crate::layout::LayoutSet;
use crate::plugin::{PluginError, PluginRegistry};
use crate::record::{GeneratorErrors, HiddenFlags, NodeRecord, PageRecord};

/// Whether consumers may treat the store as caught up with its inputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Readiness {
    /// Generation has finished and nothing is pending.
    Ready,
    /// Structural changes happened since the last time generation finished.
    #[default]
    NotReady,
    /// Generation finished but a data save is still being processed.
    WaitingUntilLastSaveHasProcessed,
}

/// Request to insert or overwrite a node record.
#[derive(Clone, Debug)]
pub struct AddNodeRequest {
    /// Target id.
    pub node_id: NodeId,
    /// Full record to store. Missing plugin fields are filled with defaults.
    pub record: NodeRecord,
    /// Layouts the request was generated against.
    pub layouts: Arc<LayoutSet>,
}

/// Request to delete a node record.
#[derive(Clone, Debug)]
pub struct RemoveNodeRequest {
    /// Target id.
    pub node_id: NodeId,
    /// Layouts the request was generated against.
    pub layouts: Arc<LayoutSet>,
}

/// A single-property change to a node record.
#[derive(Clone, Debug, PartialEq)]
pub enum NodePatch {
    /// Replace the whole resolved item.
    Item(Value),
    /// Set one top-level property of the resolved item.
    ItemProp {
        /// Property name.
        key: String,
        /// New value.
        value: Value,
    },
    /// Replace the expression-driven hidden flags.
    Hidden(HiddenFlags),
    /// Replace the row descriptor.
    Row(Option<RowDescriptor>),
    /// Replace a plugin-owned field.
    Plugin {
        /// Field name; must be owned by a registered plugin.
        field: String,
        /// New value.
        value: Value,
    },
}

/// Request to patch an existing node record.
#[derive(Clone, Debug)]
pub struct SetNodePropRequest {
    /// Target id.
    pub node_id: NodeId,
    /// The change.
    pub patch: NodePatch,
}

/// Request to patch an existing page record.
#[derive(Clone, Debug)]
pub struct SetPagePropRequest {
    /// Target page.
    pub page_key: PageKey,
    /// New hidden flags.
    pub hidden: HiddenFlags,
}

/// Record an error is attached to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorTarget {
    /// A node record.
    Node(NodeId),
    /// A page record.
    Page(PageKey),
}

/// Request to record a generation error.
#[derive(Clone, Debug)]
pub struct AddErrorRequest {
    /// Message; also the key in the target's error set.
    pub message: String,
    /// Where to record it.
    pub target: ErrorTarget,
}

/// Extra state applied on top of the fresh structure built by [`NodesStore::reset`].
#[derive(Clone, Debug, Default)]
pub struct ResetSeed {
    /// Rule results already known for the new layouts. When present, the
    /// "rules have run" flag starts out set.
    pub hidden_via_rules: Option<BTreeSet<String>>,
    /// Initial page-level hidden flags.
    pub page_hidden: Vec<(PageKey, HiddenFlags)>,
}

/// All recorded generation errors, by record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ErrorList {
    /// Page errors keyed by page key.
    pub pages: BTreeMap<String, Vec<String>>,
    /// Node errors keyed by node id.
    pub nodes: BTreeMap<String, Vec<String>>,
}

impl ErrorList {
    /// True when no record has errors.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty() && self.nodes.is_empty()
    }
}

/// An immutable snapshot of the store.
///
/// Snapshots are published as `Arc<NodesState>`; a mutation that changes
/// nothing keeps the previous snapshot, so `Arc::ptr_eq` tells whether
/// anything happened.
#[derive(Clone, Debug, Default)]
pub struct NodesState {
    layouts: Option<Arc<LayoutSet>>,
    page_order: Vec<PageKey>,
    pages: FxHashMap<PageKey, PageRecord>,
    nodes: FxHashMap<NodeId, NodeRecord>,
    children: FxHashMap<ParentRef, Vec<NodeId>>,
    hidden_via_rules: BTreeSet<String>,
    hidden_via_rules_ran: bool,
    has_errors: bool,
    readiness: Readiness,
    version: u64,
    add_remove_counter: u64,
}

impl PartialEq for NodesState {
    fn eq(&self, other: &Self) -> bool {
        let same_layouts = match (&self.layouts, &other.layouts) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_layouts
            && self.page_order == other.page_order
            && self.pages == other.pages
            && self.nodes == other.nodes
            && self.children == other.children
            && self.hidden_via_rules == other.hidden_via_rules
            && self.hidden_via_rules_ran == other.hidden_via_rules_ran
            && self.has_errors == other.has_errors
            && self.readiness == other.readiness
    }
}

impl NodesState {
    /// The layouts this state was built from, if `reset` was called.
    pub fn layouts(&self) -> Option<&Arc<LayoutSet>> {
        self.layouts.as_ref()
    }

    /// True when `layouts` is the exact layout set (by identity) this state tracks.
    pub fn is_current(&self, layouts: &Arc<LayoutSet>) -> bool {
        self.layouts.as_ref().is_some_and(|l| Arc::ptr_eq(l, layouts))
    }

    /// Page records in layout order; pages added later come last.
    pub fn pages(&self) -> impl Iterator<Item = &PageRecord> + '_ {
        self.page_order.iter().filter_map(|k| self.pages.get(k))
    }

    /// Look up a page record.
    pub fn page(&self, key: &str) -> Option<&PageRecord> {
        self.pages.get(key)
    }

    /// Look up a node record by its full id.
    pub fn node(&self, id: &str) -> Option<&NodeRecord> {
        self.nodes.get(id)
    }

    /// The stored key for a node id, if present.
    pub fn node_id(&self, id: &str) -> Option<&NodeId> {
        self.nodes.get_key_value(id).map(|(k, _)| k)
    }

    /// Every node, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &NodeRecord)> + '_ {
        self.nodes.iter()
    }

    /// Number of node records.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Direct children of a page or node, in declaration order with repeating
    /// rows ordered by row index.
    pub fn children_of(&self, parent: &ParentRef) -> &[NodeId] {
        self.children.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids currently hidden by conditional rules.
    pub fn hidden_via_rules(&self) -> &BTreeSet<String> {
        &self.hidden_via_rules
    }

    /// True once rule results were ingested at least once since the last reset.
    pub fn hidden_via_rules_ran(&self) -> bool {
        self.hidden_via_rules_ran
    }

    /// True when any generation error was recorded since the last reset.
    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    /// Current readiness.
    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    /// Ready, and rule results are known.
    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready && self.hidden_via_rules_ran
    }

    /// Incremented on every published change.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Incremented on every structural change (nodes or pages added or removed, reset).
    pub fn add_remove_counter(&self) -> u64 {
        self.add_remove_counter
    }

    /// Every recorded generation error.
    pub fn full_error_list(&self) -> ErrorList {
        let mut out = ErrorList::default();
        for page in self.pages() {
            if let Some(errors) = page.errors.as_ref().filter(|e| !e.is_empty()) {
                out.pages.insert(
                    page.page_key.to_string(),
                    errors.iter().map(str::to_owned).collect(),
                );
            }
        }
        for (id, node) in &self.nodes {
            if let Some(errors) = node.errors.as_ref().filter(|e| !e.is_empty()) {
                out.nodes
                    .insert(id.to_string(), errors.iter().map(str::to_owned).collect());
            }
        }
        out
    }

    /// True when walking up from `parent` reaches `node`.
    fn reaches(&self, parent: &ParentRef, node: &NodeId) -> bool {
        let mut current = parent.node();
        while let Some(id) = current {
            if id == node {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent.node());
        }
        false
    }

    fn ensure_page(&mut self, key: &PageKey) -> bool {
        if self.pages.contains_key(key) {
            return false;
        }
        self.pages.insert(key.clone(), PageRecord::new(key.clone()));
        self.page_order.push(key.clone());
        true
    }

    fn link_child(&mut self, parent: &ParentRef, child: &NodeId) {
        let parent_rows = parent.node().map_or(0, |p| p.row_path().len());
        let layouts = self.layouts.clone();
        let key = |id: &NodeId| {
            let row = if id.row_path().len() > parent_rows {
                id.innermost_row().unwrap_or(0)
            } else {
                0
            };
            let position = layouts
                .as_ref()
                .and_then(|l| l.info(id.base()))
                .map_or(usize::MAX, |i| i.position);
            (row, position)
        };
        let list = self.children.entry(parent.clone()).or_default();
        if list.contains(child) {
            return;
        }
        let target = (key(child), child.as_str());
        let at = list.partition_point(|c| (key(c), c.as_str()) < target);
        list.insert(at, child.clone());
    }

    fn unlink_child(&mut self, parent: &ParentRef, child: &NodeId) {
        if let Some(list) = self.children.get_mut(parent) {
            list.retain(|c| c != child);
            if list.is_empty() {
                self.children.remove(parent);
            }
        }
    }
}

type Listener = Box<dyn FnMut(&Arc<NodesState>) + Send>;

/// Handle returned by [`NodesStore::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// The single source of truth for page and node records.
///
/// Every mutation is a batch that results in at most one published snapshot.
/// Requests that target missing records, or that were generated against a
/// superseded layout set, are dropped silently.
pub struct NodesStore {
    state: Arc<NodesState>,
    plugins: Arc<PluginRegistry>,
    listeners: Vec<(Subscription, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for NodesStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodesStore")
            .field("version", &self.state.version)
            .field("nodes", &self.state.nodes.len())
            .field("pages", &self.state.pages.len())
            .field("plugins", &self.plugins)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Default for NodesStore {
    fn default() -> Self {
        Self::new(PluginRegistry::default())
    }
}

impl NodesStore {
    /// Create an empty store with the given plugins.
    pub fn new(plugins: PluginRegistry) -> Self {
        Self {
            state: Arc::new(NodesState::default()),
            plugins: Arc::new(plugins),
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<NodesState> {
        Arc::clone(&self.state)
    }

    /// Borrow the current snapshot.
    pub fn state(&self) -> &NodesState {
        &self.state
    }

    /// Registered plugins.
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Call `listener` after each published change.
    pub fn subscribe(&mut self, listener: impl FnMut(&Arc<NodesState>) + Send + 'static) -> Subscription {
        let id = Subscription(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(id, _)| *id != subscription);
        before != self.listeners.len()
    }

    fn publish(&mut self, mut next: NodesState) {
        next.version = self.state.version + 1;
        self.state = Arc::new(next);
        for (_, listener) in &mut self.listeners {
            listener(&self.state);
        }
    }

    fn draft(&self) -> NodesState {
        (*self.state).clone()
    }

    /// Replace the whole state with empty records for every page of `layouts`.
    ///
    /// Page records are created eagerly so pages can be queried before any node
    /// on them has been generated.
    pub fn reset(&mut self, layouts: Arc<LayoutSet>, seed: ResetSeed) {
        let mut next = NodesState {
            add_remove_counter: self.state.add_remove_counter + 1,
            ..NodesState::default()
        };
        for key in layouts.page_keys() {
            next.ensure_page(key);
        }
        for (key, hidden) in seed.page_hidden {
            if let Some(page) = next.pages.get_mut(&key) {
                page.hidden = hidden;
            }
        }
        if let Some(hidden) = seed.hidden_via_rules {
            next.hidden_via_rules = hidden;
            next.hidden_via_rules_ran = true;
        }
        debug!(pages = next.page_order.len(), "reset node store");
        next.layouts = Some(layouts);
        self.publish(next);
    }

    /// Insert or overwrite node records. Returns how many records changed.
    ///
    /// Requests generated against anything but the current layouts are dropped,
    /// as are requests whose parent chain leads back to the node itself.
    /// Later requests for the same id win. Storing a record identical to the
    /// existing one is not a change.
    pub fn add_nodes(&mut self, requests: Vec<AddNodeRequest>) -> usize {
        let defaults = self.plugins.defaults();
        let mut draft = Draft::new(&self.state);
        let mut changed = 0;
        for AddNodeRequest {
            node_id,
            mut record,
            layouts,
        } in requests
        {
            let current = draft.current();
            if !current.is_current(&layouts) {
                trace!(node = %node_id, "dropping add for stale layouts");
                continue;
            }
            if current.reaches(&record.parent, &node_id) {
                trace!(node = %node_id, parent = ?record.parent, "dropping add that would nest a node under itself");
                continue;
            }
            for (field, value) in &defaults {
                if !record.plugins.contains_key(field) {
                    record.plugins.insert(field.clone(), value.clone());
                }
            }
            let old_parent = match current.nodes.get(&node_id) {
                Some(existing) if *existing == record => continue,
                Some(existing) => Some(existing.parent.clone()),
                None => None,
            };
            let next = draft.edit();
            if let Some(old) = old_parent.filter(|p| *p != record.parent) {
                next.unlink_child(&old, &node_id);
            }
            next.link_child(&record.parent, &node_id);
            next.nodes.insert(node_id, record);
            changed += 1;
        }
        if let Some(mut next) = draft.finish() {
            next.readiness = Readiness::NotReady;
            next.add_remove_counter += 1;
            debug!(changed, "added nodes");
            self.publish(next);
        }
        changed
    }

    /// Delete node records. Returns how many were removed.
    ///
    /// Requests for missing ids, or generated against anything but the current
    /// layouts, are dropped. Nothing is published when nothing was removed.
    pub fn remove_nodes(&mut self, requests: Vec<RemoveNodeRequest>) -> usize {
        let mut draft = Draft::new(&self.state);
        let mut removed = 0;
        for RemoveNodeRequest { node_id, layouts } in requests {
            let current = draft.current();
            if !current.is_current(&layouts) {
                trace!(node = %node_id, "dropping removal for stale layouts");
                continue;
            }
            if !current.nodes.contains_key(&node_id) {
                trace!(node = %node_id, "dropping removal of missing node");
                continue;
            }
            let next = draft.edit();
            if let Some(record) = next.nodes.remove(&node_id) {
                next.unlink_child(&record.parent, &node_id);
                removed += 1;
            }
        }
        let Some(mut next) = draft.finish() else {
            return 0;
        };
        next.readiness = Readiness::NotReady;
        next.add_remove_counter += 1;
        debug!(removed, "removed nodes");
        self.publish(next);
        removed
    }

    /// Patch single properties of existing node records. Returns how many
    /// patches changed something.
    ///
    /// Unknown ids and plugin fields no plugin owns are skipped. A patch whose
    /// value deep-equals the current value is not a change, and a batch of
    /// such patches copies nothing.
    pub fn set_node_props(&mut self, requests: Vec<SetNodePropRequest>) -> usize {
        let mut draft = Draft::new(&self.state);
        let mut changed = 0;
        for SetNodePropRequest { node_id, patch } in requests {
            let Some(record) = draft.current().nodes.get(&node_id) else {
                trace!(node = %node_id, "dropping patch of missing node");
                continue;
            };
            if let NodePatch::Plugin { field, .. } = &patch
                && !self.plugins.owns_field(field)
            {
                trace!(node = %node_id, %field, "dropping patch of unowned plugin field");
                continue;
            }
            if !patch_changes(record, &patch) {
                continue;
            }
            if let Some(record) = draft.edit().nodes.get_mut(&node_id) {
                apply_patch(record, patch);
                changed += 1;
            }
        }
        if let Some(next) = draft.finish() {
            debug!(changed, "patched nodes");
            self.publish(next);
        }
        changed
    }

    /// Patch page hidden flags. Returns how many pages changed.
    pub fn set_page_props(&mut self, requests: Vec<SetPagePropRequest>) -> usize {
        let mut draft = Draft::new(&self.state);
        let mut changed = 0;
        for SetPagePropRequest { page_key, hidden } in requests {
            let Some(page) = draft.current().pages.get(&page_key) else {
                trace!(page = %page_key, "dropping patch of missing page");
                continue;
            };
            if page.hidden == hidden {
                continue;
            }
            if let Some(page) = draft.edit().pages.get_mut(&page_key) {
                page.hidden = hidden;
                changed += 1;
            }
        }
        if let Some(next) = draft.finish() {
            debug!(changed, "patched pages");
            self.publish(next);
        }
        changed
    }

    /// Replace the hidden-via-rule set and note that rules have run.
    ///
    /// `hidden` holds the ids the rules hide; ids the rules leave visible are
    /// simply absent. See [`mark_hidden_via_rule_flags`](Self::mark_hidden_via_rule_flags)
    /// for rule output shaped as `id -> hidden`.
    ///
    /// When `hidden` equals the current set only the "has run" flag is updated,
    /// and when that flag is already set nothing is published. Returns true
    /// when a new snapshot was published.
    pub fn mark_hidden_via_rule(&mut self, hidden: BTreeSet<String>) -> bool {
        let same = self.state.hidden_via_rules == hidden;
        if same && self.state.hidden_via_rules_ran {
            return false;
        }
        let mut next = self.draft();
        next.hidden_via_rules_ran = true;
        if !same {
            debug!(hidden = hidden.len(), "hidden rules changed");
            next.hidden_via_rules = hidden;
        }
        self.publish(next);
        true
    }

    /// [`mark_hidden_via_rule`](Self::mark_hidden_via_rule) for an `id -> hidden`
    /// mapping. Only ids mapped to `true` are kept.
    pub fn mark_hidden_via_rule_flags<K: Into<String>>(
        &mut self,
        flags: impl IntoIterator<Item = (K, bool)>,
    ) -> bool {
        let hidden = flags
            .into_iter()
            .filter(|(_, hidden)| *hidden)
            .map(|(id, _)| id.into())
            .collect();
        self.mark_hidden_via_rule(hidden)
    }

    /// Record a generation error on a node or page.
    pub fn add_error(&mut self, message: impl Into<String>, target: ErrorTarget) -> bool {
        self.add_errors(vec![AddErrorRequest {
            message: message.into(),
            target,
        }]) > 0
    }

    /// Record generation errors. Returns how many were new.
    ///
    /// Errors are sticky until the next reset. Missing targets are skipped.
    pub fn add_errors(&mut self, requests: Vec<AddErrorRequest>) -> usize {
        let mut draft = Draft::new(&self.state);
        let mut added = 0;
        for AddErrorRequest { message, target } in requests {
            let current = draft.current();
            let existing = match &target {
                ErrorTarget::Node(id) => current.nodes.get(id).map(|n| &n.errors),
                ErrorTarget::Page(key) => current.pages.get(key).map(|p| &p.errors),
            };
            let Some(existing) = existing else {
                trace!(?target, "dropping error for missing target");
                continue;
            };
            if existing.as_ref().is_some_and(|e| e.contains(&message)) {
                continue;
            }
            let next = draft.edit();
            let errors = match &target {
                ErrorTarget::Node(id) => next.nodes.get_mut(id).map(|n| &mut n.errors),
                ErrorTarget::Page(key) => next.pages.get_mut(key).map(|p| &mut p.errors),
            };
            if let Some(errors) = errors {
                errors
                    .get_or_insert_with(GeneratorErrors::default)
                    .insert(message.as_str());
                warn!(?target, %message, "generation error");
                added += 1;
            }
        }
        if let Some(mut next) = draft.finish() {
            next.has_errors = true;
            next.readiness = Readiness::NotReady;
            self.publish(next);
        }
        added
    }

    /// Ensure a page record exists.
    pub fn add_page(&mut self, page_key: PageKey) -> bool {
        self.add_pages(vec![page_key]) > 0
    }

    /// Ensure page records exist. Returns how many were created.
    pub fn add_pages(&mut self, page_keys: Vec<PageKey>) -> usize {
        if page_keys.iter().all(|k| self.state.pages.contains_key(k)) {
            return 0;
        }
        let mut next = self.draft();
        let added = page_keys.iter().filter(|k| next.ensure_page(k)).count();
        next.readiness = Readiness::NotReady;
        next.add_remove_counter += 1;
        debug!(added, "added pages");
        self.publish(next);
        added
    }

    /// Set readiness. Returns false when it was already `readiness`.
    pub fn mark_ready(&mut self, readiness: Readiness) -> bool {
        if self.state.readiness == readiness {
            return false;
        }
        let mut next = self.draft();
        next.readiness = readiness;
        self.publish(next);
        true
    }

    /// Run a plugin mutation against one node. Returns how many fields changed.
    ///
    /// A missing node is not an error and changes nothing.
    pub fn run_plugin_mutation(&mut self, mutation: &str, node: &str, args: &Value) -> Result<usize, PluginError> {
        let Some((id, record)) = self.state.nodes.get_key_value(node) else {
            trace!(node, mutation, "dropping plugin mutation for missing node");
            return Ok(0);
        };
        let patches = self.plugins.run_mutation(mutation, id, record, args)?;
        let requests = patches
            .into_pending()
            .into_iter()
            .map(|(node_id, field, value)| SetNodePropRequest {
                node_id,
                patch: NodePatch::Plugin { field, value },
            })
            .collect();
        Ok(self.set_node_props(requests))
    }

    /// Answer a plugin query about one node; `None` when the node is missing.
    pub fn query_plugin(&self, query: &str, node: &str, args: &Value) -> Result<Option<Value>, PluginError> {
        match self.state.nodes.get(node) {
            Some(record) => self.plugins.run_query(query, record, args).map(Some),
            None => Ok(None),
        }
    }
}

/// Copy-on-first-write view of a snapshot.
///
/// Reads go to the published snapshot until the first edit clones it.
struct Draft<'s> {
    base: &'s NodesState,
    next: Option<NodesState>,
}

impl<'s> Draft<'s> {
    fn new(base: &'s NodesState) -> Self {
        Self { base, next: None }
    }

    fn current(&self) -> &NodesState {
        self.next.as_ref().unwrap_or(self.base)
    }

    fn edit(&mut self) -> &mut NodesState {
        let base = self.base;
        self.next.get_or_insert_with(|| base.clone())
    }

    /// The edited state, or `None` when nothing was edited.
    fn finish(self) -> Option<NodesState> {
        self.next
    }
}

fn patch_changes(record: &NodeRecord, patch: &NodePatch) -> bool {
    match patch {
        NodePatch::Item(value) => record.item != *value,
        NodePatch::ItemProp { key, value } => record.item.get(key.as_str()) != Some(value),
        NodePatch::Hidden(hidden) => record.hidden != *hidden,
        NodePatch::Row(row) => record.row != *row,
        NodePatch::Plugin { field, value } => record.plugins.get(field.as_str()) != Some(value),
    }
}

fn apply_patch(record: &mut NodeRecord, patch: NodePatch) {
    match patch {
        NodePatch::Item(value) => record.item = value,
        NodePatch::ItemProp { key, value } => {
            if !record.item.is_object() {
                record.item = Value::Object(serde_json::Map::new());
            }
            if let Some(item) = record.item.as_object_mut() {
                item.insert(key, value);
            }
        }
        NodePatch::Hidden(hidden) => record.hidden = hidden,
        NodePatch::Row(row) => record.row = row,
        NodePatch::Plugin { field, value } => {
            record.plugins.insert(field, value);
        }
    }
}
