// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The generation pass: layout declarations to queued store requests.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use understory_node_store::{
    AddErrorRequest, AddNodeRequest, ComponentDecl, ErrorTarget, HiddenFlags, LayoutSet, NodeId,
    NodePatch, NodeRecord, NodesState, PageKey, ParentRef, RemoveNodeRequest, RowDescriptor, RowId,
    SetNodePropRequest,
};

use crate::queue::CommitQueue;

/// Supplies the rows of repeating structures.
pub trait RowSource {
    /// Stable ids of the rows of the repeating node `node`, in display order.
    fn rows(&self, node: &NodeId) -> Vec<RowId>;
}

impl<F: Fn(&NodeId) -> Vec<RowId>> RowSource for F {
    fn rows(&self, node: &NodeId) -> Vec<RowId> {
        self(node)
    }
}

/// Row counts keyed by rendered node id; unknown structures have no rows.
#[derive(Clone, Debug, Default)]
pub struct StaticRows(FxHashMap<String, Vec<RowId>>);

impl StaticRows {
    /// No rows anywhere.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rows of `node`.
    pub fn set(&mut self, node: impl Into<String>, rows: impl IntoIterator<Item = RowId>) {
        self.0.insert(node.into(), rows.into_iter().collect());
    }

    /// Builder form of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, node: impl Into<String>, rows: impl IntoIterator<Item = RowId>) -> Self {
        self.set(node, rows);
        self
    }
}

impl RowSource for StaticRows {
    fn rows(&self, node: &NodeId) -> Vec<RowId> {
        self.0.get(node.as_str()).cloned().unwrap_or_default()
    }
}

/// Produces resolved properties for a node.
///
/// Expression evaluation lives behind this trait; the generation pass only
/// compares what it returns with what the store holds.
pub trait ItemResolver {
    /// Resolved item for `node`, materialized from `decl`.
    fn resolve(&self, node: &NodeId, decl: &ComponentDecl) -> Value;

    /// Expression-driven hidden flags for `node`.
    fn hidden(&self, node: &NodeId, decl: &ComponentDecl) -> HiddenFlags {
        let _ = (node, decl);
        HiddenFlags::empty()
    }
}

/// Resolves every node to its declared properties, unevaluated.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeclaredProps;

impl ItemResolver for DeclaredProps {
    fn resolve(&self, _node: &NodeId, decl: &ComponentDecl) -> Value {
        Value::Object(decl.props.clone())
    }
}

/// Limits for the generation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Deepest allowed nesting of repeating structures. Deeper structures are
    /// materialized without rows and get a node error.
    pub max_repeating_depth: usize,
    /// Most rows materialized per repeating structure. Extra rows are skipped
    /// and the structure gets a node error.
    pub max_rows: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_repeating_depth: 8,
            max_rows: 10_000,
        }
    }
}

/// Counts of what one [`Generator::run`] queued.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// Page additions queued.
    pub pages: usize,
    /// Node additions queued (new nodes, or nodes whose placement changed).
    pub added: usize,
    /// Node patches queued.
    pub patched: usize,
    /// Node removals queued.
    pub removed: usize,
    /// Errors queued.
    pub errors: usize,
    /// Nodes the layout currently materializes to.
    pub materialized: usize,
}

impl GenerationReport {
    /// True when nothing was queued.
    pub fn is_empty(&self) -> bool {
        self.pages + self.added + self.patched + self.removed + self.errors == 0
    }
}

/// Walks the current layouts and queues whatever brings the store in line.
///
/// A run is a pure function of the snapshot, the row source and the resolver;
/// running it again before the queue is flushed queues the same requests again,
/// which the store then treats as no-ops.
#[derive(Clone, Debug, Default)]
pub struct Generator {
    config: GeneratorConfig,
}

struct Walk<'a> {
    layouts: &'a Arc<LayoutSet>,
    snapshot: &'a NodesState,
    rows: &'a dyn RowSource,
    resolver: &'a dyn ItemResolver,
    queue: &'a mut CommitQueue,
    config: GeneratorConfig,
    seen: FxHashSet<NodeId>,
    report: GenerationReport,
}

/// Where the walk currently is: page, parent, and innermost row.
struct Scope<'s> {
    page: &'s PageKey,
    parent: ParentRef,
    row: Option<RowDescriptor>,
    repeating_depth: usize,
}

impl Generator {
    /// A generator with the given limits.
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// The active limits.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Diff the layouts of `snapshot` against its nodes and queue the difference.
    ///
    /// Does nothing when the store was never reset.
    pub fn run(
        &self,
        snapshot: &NodesState,
        rows: &dyn RowSource,
        resolver: &dyn ItemResolver,
        queue: &mut CommitQueue,
    ) -> GenerationReport {
        let Some(layouts) = snapshot.layouts() else {
            return GenerationReport::default();
        };
        let mut walk = Walk {
            layouts,
            snapshot,
            rows,
            resolver,
            queue,
            config: self.config,
            seen: FxHashSet::default(),
            report: GenerationReport::default(),
        };
        for (page, decls) in layouts.pages() {
            if snapshot.page(page.as_str()).is_none() {
                walk.queue.add_page(page.clone());
                walk.report.pages += 1;
            }
            let scope = Scope {
                page,
                parent: ParentRef::Page(page.clone()),
                row: None,
                repeating_depth: 0,
            };
            for decl in decls {
                walk.materialize(decl, &[], &scope);
            }
        }
        for dup in layouts.duplicates() {
            let message = format!("component id `{}` is declared more than once", dup.id);
            walk.error(message, ErrorTarget::Page(dup.page.clone()));
        }
        walk.remove_unseen();
        walk.report.materialized = walk.seen.len();
        debug!(report = ?walk.report, "generation pass");
        walk.report
    }
}

impl Walk<'_> {
    fn materialize(&mut self, decl: &ComponentDecl, row_path: &[usize], scope: &Scope<'_>) {
        let id = NodeId::with_rows(&decl.id, row_path);
        if self.seen.contains(&id) {
            // Exact duplicates are reported once by the duplicate pass below.
            if !self.layouts.duplicates().iter().any(|dup| dup.id == decl.id) {
                self.error(
                    format!(
                        "component `{}` materializes to node id `{id}`, which another component already uses",
                        decl.id
                    ),
                    ErrorTarget::Page(scope.page.clone()),
                );
            }
            return;
        }
        let mut record = NodeRecord::new(decl.type_tag.clone(), scope.page.clone(), scope.parent.clone())
            .with_item(self.resolver.resolve(&id, decl));
        record.row = scope.row.clone();
        record.hidden = self.resolver.hidden(&id, decl);
        self.sync(&id, record);
        self.seen.insert(id.clone());

        if decl.children.is_empty() {
            return;
        }
        if !decl.repeating {
            let inner = Scope {
                page: scope.page,
                parent: ParentRef::Node(id),
                row: scope.row.clone(),
                repeating_depth: scope.repeating_depth,
            };
            for child in &decl.children {
                self.materialize(child, row_path, &inner);
            }
            return;
        }
        if scope.repeating_depth >= self.config.max_repeating_depth {
            self.error(
                format!(
                    "repeating structures nested deeper than {}",
                    self.config.max_repeating_depth
                ),
                ErrorTarget::Node(id),
            );
            return;
        }
        let mut rows = self.rows.rows(&id);
        if rows.len() > self.config.max_rows {
            self.error(
                format!("more than {} rows", self.config.max_rows),
                ErrorTarget::Node(id.clone()),
            );
            rows.truncate(self.config.max_rows);
        }
        let mut path = row_path.to_vec();
        for (index, row_id) in rows.into_iter().enumerate() {
            path.push(index);
            let inner = Scope {
                page: scope.page,
                parent: ParentRef::Node(id.clone()),
                row: Some(RowDescriptor { index, row_id }),
                repeating_depth: scope.repeating_depth + 1,
            };
            for child in &decl.children {
                self.materialize(child, &path, &inner);
            }
            path.pop();
        }
    }

    fn sync(&mut self, id: &NodeId, record: NodeRecord) {
        let Some(existing) = self.snapshot.node(id.as_str()) else {
            self.add(id, record);
            return;
        };
        if existing.type_tag != record.type_tag
            || existing.parent != record.parent
            || existing.page != record.page
        {
            self.add(id, record);
            return;
        }
        if existing.item != record.item {
            self.patch(id, NodePatch::Item(record.item));
        }
        if existing.row != record.row {
            self.patch(id, NodePatch::Row(record.row));
        }
        if existing.hidden != record.hidden {
            self.patch(id, NodePatch::Hidden(record.hidden));
        }
    }

    fn add(&mut self, id: &NodeId, record: NodeRecord) {
        self.queue.add_node(AddNodeRequest {
            node_id: id.clone(),
            record,
            layouts: Arc::clone(self.layouts),
        });
        self.report.added += 1;
    }

    fn patch(&mut self, id: &NodeId, patch: NodePatch) {
        self.queue.set_node_prop(SetNodePropRequest {
            node_id: id.clone(),
            patch,
        });
        self.report.patched += 1;
    }

    fn error(&mut self, message: String, target: ErrorTarget) {
        let known = match &target {
            ErrorTarget::Node(id) => self
                .snapshot
                .node(id.as_str())
                .and_then(|n| n.errors.as_ref())
                .is_some_and(|e| e.contains(&message)),
            ErrorTarget::Page(key) => self
                .snapshot
                .page(key.as_str())
                .and_then(|p| p.errors.as_ref())
                .is_some_and(|e| e.contains(&message)),
        };
        if known {
            return;
        }
        self.queue.add_error(AddErrorRequest { message, target });
        self.report.errors += 1;
    }

    fn remove_unseen(&mut self) {
        let snapshot = self.snapshot;
        let mut stale: Vec<&NodeId> = snapshot
            .nodes()
            .map(|(id, _)| id)
            .filter(|id| !self.seen.contains(*id))
            .collect();
        stale.sort();
        for id in stale {
            self.queue.remove_node(RemoveNodeRequest {
                node_id: id.clone(),
                layouts: Arc::clone(self.layouts),
            });
            self.report.removed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use understory_node_store::{NodesStore, ResetSeed};

    fn layouts() -> Arc<LayoutSet> {
        Arc::new(
            LayoutSet::from_json(
                r#"{
                    "P": [
                        { "id": "R", "type": "RepeatingGroup", "repeating": true, "children": [
                            { "id": "F", "type": "Input", "label": "Field" }
                        ]}
                    ]
                }"#,
            )
            .unwrap(),
        )
    }

    fn rows(n: usize) -> StaticRows {
        StaticRows::new().with("R", (0..n).map(|i| RowId::new(format!("r{i}"))))
    }

    fn generate(store: &mut NodesStore, rows: &StaticRows) -> GenerationReport {
        let mut queue = CommitQueue::default();
        let report = Generator::default().run(&store.snapshot(), rows, &DeclaredProps, &mut queue);
        queue.flush(store);
        report
    }

    #[test]
    fn materializes_one_node_per_row() {
        let mut store = NodesStore::default();
        store.reset(layouts(), ResetSeed::default());
        let report = generate(&mut store, &rows(2));
        assert_eq!(report.added, 3);
        assert_eq!(report.materialized, 3);
        let f1 = store.state().node("F-1").unwrap();
        assert_eq!(f1.row, Some(RowDescriptor::new(1, "r1")));
        assert_eq!(f1.item, json!({ "label": "Field" }));
        assert_eq!(f1.parent, ParentRef::Node(NodeId::new("R")));
    }

    #[test]
    fn second_run_is_quiet() {
        let mut store = NodesStore::default();
        store.reset(layouts(), ResetSeed::default());
        generate(&mut store, &rows(2));
        let before = store.snapshot();
        let report = generate(&mut store, &rows(2));
        assert!(report.is_empty(), "{report:?}");
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn deleting_a_row_removes_and_renumbers() {
        let mut store = NodesStore::default();
        store.reset(layouts(), ResetSeed::default());
        generate(&mut store, &rows(3));
        // Drop the first row: the old second row becomes index 0.
        let remaining = StaticRows::new().with("R", [RowId::new("r1"), RowId::new("r2")]);
        let report = generate(&mut store, &remaining);
        assert_eq!(report.removed, 1);
        assert!(store.state().node("F-2").is_none());
        let f0 = store.state().node("F-0").unwrap();
        assert_eq!(f0.row, Some(RowDescriptor::new(0, "r1")));
    }

    #[test]
    fn row_limit_records_error() {
        let mut store = NodesStore::default();
        store.reset(layouts(), ResetSeed::default());
        let mut queue = CommitQueue::default();
        let generator = Generator::new(GeneratorConfig {
            max_rows: 1,
            ..GeneratorConfig::default()
        });
        let report = generator.run(&store.snapshot(), &rows(3), &DeclaredProps, &mut queue);
        queue.flush(&mut store);
        assert_eq!(report.errors, 1);
        assert!(store.state().node("F-1").is_none());
        assert!(store.state().node("R").unwrap().has_errors());
    }

    fn store_for(json: &str) -> NodesStore {
        let mut store = NodesStore::default();
        store.reset(Arc::new(LayoutSet::from_json(json).unwrap()), ResetSeed::default());
        store
    }

    #[test]
    fn row_suffixed_id_collision_is_reported_and_settles() {
        let mut store = store_for(
            r#"{ "P": [
                { "id": "D-1", "type": "Paragraph" },
                { "id": "R", "type": "RepeatingGroup", "repeating": true, "children": [
                    { "id": "D", "type": "Input" }
                ]}
            ]}"#,
        );
        let first = generate(&mut store, &rows(2));
        assert_eq!(first.errors, 1);
        let d1 = store.state().node("D-1").unwrap();
        assert_eq!(d1.type_tag, "Paragraph");
        assert_eq!(d1.parent, ParentRef::Page(PageKey::from("P")));
        assert_eq!(store.state().node("D-0").unwrap().type_tag, "Input");
        let errors = store.state().full_error_list();
        assert_eq!(errors.pages["P"].len(), 1);
        assert!(errors.pages["P"][0].contains("`D-1`"));

        let before = store.snapshot();
        for _ in 0..2 {
            let again = generate(&mut store, &rows(2));
            assert!(again.is_empty(), "{again:?}");
        }
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn duplicate_declarations_become_page_errors() {
        let mut store = store_for(
            r#"{
                "P1": [ { "id": "X", "type": "Input" } ],
                "P2": [ { "id": "X", "type": "Paragraph" }, { "id": "Y", "type": "Input" } ]
            }"#,
        );
        let report = generate(&mut store, &rows(0));
        assert_eq!(report.errors, 1);
        let errors = store.state().full_error_list();
        assert_eq!(
            errors.pages["P2"],
            ["component id `X` is declared more than once"]
        );
        assert!(!errors.pages.contains_key("P1"));
        assert_eq!(store.state().node("X").unwrap().type_tag, "Input");
        assert!(store.state().node("Y").is_some());
        assert!(generate(&mut store, &rows(0)).is_empty());
    }

    #[test]
    fn repeating_depth_limit_records_error() {
        let mut store = store_for(
            r#"{ "P": [
                { "id": "O", "type": "RepeatingGroup", "repeating": true, "children": [
                    { "id": "N", "type": "RepeatingGroup", "repeating": true, "children": [
                        { "id": "L", "type": "Input" }
                    ]}
                ]}
            ]}"#,
        );
        let source = StaticRows::new()
            .with("O", [RowId::new("o0")])
            .with("N-0", [RowId::new("n0")]);
        let generator = Generator::new(GeneratorConfig {
            max_repeating_depth: 1,
            ..GeneratorConfig::default()
        });
        let mut queue = CommitQueue::default();
        let report = generator.run(&store.snapshot(), &source, &DeclaredProps, &mut queue);
        queue.flush(&mut store);
        assert_eq!(report.errors, 1);
        assert!(store.state().node("N-0").unwrap().has_errors());
        assert!(store.state().node("L-0-0").is_none());
        assert!(!store.state().node("O").unwrap().has_errors());

        let mut queue = CommitQueue::default();
        let again = generator.run(&store.snapshot(), &source, &DeclaredProps, &mut queue);
        assert!(again.is_empty(), "{again:?}");
    }

    #[test]
    fn unreset_store_generates_nothing() {
        let store = NodesStore::default();
        let mut queue = CommitQueue::default();
        let report = Generator::default().run(&store.snapshot(), &rows(1), &DeclaredProps, &mut queue);
        assert!(report.is_empty());
        assert!(queue.is_settled());
    }
}
