// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Plugin extension mechanism.
//!
//! Features that need per-node state (validation results, attachment lists, ...)
//! implement [`NodeDataPlugin`] and are registered in a [`PluginRegistry`] before the
//! store is constructed. The store folds every plugin's [`default_state`] into each
//! new node record, and routes named mutations and queries to the owning plugin.
//!
//! Plugins never get a mutable reference to the node table. A mutation receives a
//! read-only record and a [`PluginPatches`] sink that only accepts writes to the
//! plugin's own fields; the store then applies the collected patches in one write.
//!
//! [`default_state`]: NodeDataPlugin::default_state

use std::fmt;

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::id::NodeId;
use crate::record::NodeRecord;

/// Field names owned by the core node shape; plugins may not claim them.
pub const RESERVED_FIELDS: &[&str] = &[
    "id", "type", "type_tag", "page", "parent", "item", "row", "hidden", "errors",
];

/// Errors from plugin registration and dispatch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PluginError {
    /// Two plugins declared the same state field.
    #[error("plugin `{plugin}` declares field `{field}` already owned by `{owner}`")]
    FieldCollision {
        /// Field name.
        field: String,
        /// Plugin being registered.
        plugin: String,
        /// Plugin that already owns the field.
        owner: String,
    },
    /// A plugin declared a field reserved by the core node shape.
    #[error("plugin `{plugin}` declares reserved field `{field}`")]
    ReservedField {
        /// Field name.
        field: String,
        /// Plugin being registered.
        plugin: String,
    },
    /// Two plugins declared the same mutation or query name.
    #[error("plugin `{plugin}` declares entry point `{name}` already owned by `{owner}`")]
    EntryPointCollision {
        /// Mutation or query name.
        name: String,
        /// Plugin being registered.
        plugin: String,
        /// Plugin that already owns the name.
        owner: String,
    },
    /// No registered plugin handles this mutation.
    #[error("unknown plugin mutation `{0}`")]
    UnknownMutation(String),
    /// No registered plugin handles this query.
    #[error("unknown plugin query `{0}`")]
    UnknownQuery(String),
    /// A plugin tried to patch a field it does not own.
    #[error("plugin `{plugin}` may not write field `{field}`")]
    ForeignField {
        /// Offending plugin.
        plugin: String,
        /// Field it tried to write.
        field: String,
    },
    /// Arguments did not have the shape the entry point expects.
    #[error("invalid arguments for `{name}`: {reason}")]
    InvalidArgs {
        /// Mutation or query name.
        name: String,
        /// Deserialization failure.
        reason: String,
    },
}

/// A feature that contributes per-node state and entry points to the store.
pub trait NodeDataPlugin: fmt::Debug + Send + Sync {
    /// Unique plugin name, used in diagnostics.
    fn name(&self) -> &'static str;

    /// Fields this plugin owns, with the value every new node starts with.
    fn default_state(&self) -> Vec<(&'static str, Value)>;

    /// Mutation names handled by [`mutate`](Self::mutate).
    fn mutations(&self) -> &'static [&'static str] {
        &[]
    }

    /// Query names handled by [`query`](Self::query).
    fn queries(&self) -> &'static [&'static str] {
        &[]
    }

    /// Apply a named mutation to one node by queueing patches.
    fn mutate(
        &self,
        mutation: &str,
        node: &NodeId,
        record: &NodeRecord,
        args: &Value,
        patches: &mut PluginPatches,
    ) -> Result<(), PluginError> {
        let _ = (node, record, args, patches);
        Err(PluginError::UnknownMutation(mutation.to_owned()))
    }

    /// Answer a named query about one node.
    fn query(&self, query: &str, record: &NodeRecord, args: &Value) -> Result<Value, PluginError> {
        let _ = (record, args);
        Err(PluginError::UnknownQuery(query.to_owned()))
    }
}

/// Write sink handed to [`NodeDataPlugin::mutate`].
///
/// Only fields owned by the mutating plugin are accepted.
#[derive(Debug)]
pub struct PluginPatches {
    plugin: &'static str,
    fields: Vec<&'static str>,
    pending: Vec<(NodeId, String, Value)>,
}

impl PluginPatches {
    pub(crate) fn new(plugin: &'static str, fields: Vec<&'static str>) -> Self {
        Self {
            plugin,
            fields,
            pending: Vec::new(),
        }
    }

    /// Queue a write of `value` to `field` on `node`.
    pub fn set_field(&mut self, node: &NodeId, field: &str, value: Value) -> Result<(), PluginError> {
        if !self.fields.iter().any(|f| *f == field) {
            return Err(PluginError::ForeignField {
                plugin: self.plugin.to_owned(),
                field: field.to_owned(),
            });
        }
        self.pending.push((node.clone(), field.to_owned(), value));
        Ok(())
    }

    /// Number of queued writes.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing was queued.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub(crate) fn into_pending(self) -> Vec<(NodeId, String, Value)> {
        self.pending
    }
}

/// Deserialize plugin arguments, mapping failures to [`PluginError::InvalidArgs`].
pub fn parse_args<T: DeserializeOwned>(name: &str, args: &Value) -> Result<T, PluginError> {
    T::deserialize(args).map_err(|err| PluginError::InvalidArgs {
        name: name.to_owned(),
        reason: err.to_string(),
    })
}

/// Ordered set of registered plugins with collision-checked ownership maps.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn NodeDataPlugin>>,
    fields: FxHashMap<&'static str, usize>,
    entry_points: FxHashMap<&'static str, usize>,
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in validation and attachments plugins.
    pub fn builtin() -> Result<Self, PluginError> {
        Self::new()
            .with(crate::plugins::ValidationPlugin)?
            .with(crate::plugins::AttachmentsPlugin)
    }

    /// Register a plugin, consuming and returning the registry.
    pub fn with(mut self, plugin: impl NodeDataPlugin + 'static) -> Result<Self, PluginError> {
        self.register(plugin)?;
        Ok(self)
    }

    /// Register a plugin.
    ///
    /// Fails without modifying the registry when any of the plugin's fields is
    /// reserved or already owned, or any of its entry point names is taken.
    pub fn register(&mut self, plugin: impl NodeDataPlugin + 'static) -> Result<(), PluginError> {
        let name = plugin.name();
        let idx = self.plugins.len();
        let defaults = plugin.default_state();
        for (field, _) in &defaults {
            if RESERVED_FIELDS.contains(field) {
                return Err(PluginError::ReservedField {
                    field: (*field).to_owned(),
                    plugin: name.to_owned(),
                });
            }
            if let Some(&owner) = self.fields.get(field) {
                return Err(PluginError::FieldCollision {
                    field: (*field).to_owned(),
                    plugin: name.to_owned(),
                    owner: self.plugins[owner].name().to_owned(),
                });
            }
        }
        let names = plugin.mutations().iter().chain(plugin.queries());
        for entry in names.clone() {
            if let Some(&owner) = self.entry_points.get(entry) {
                return Err(PluginError::EntryPointCollision {
                    name: (*entry).to_owned(),
                    plugin: name.to_owned(),
                    owner: self.plugins[owner].name().to_owned(),
                });
            }
        }
        let entries: Vec<&'static str> = names.copied().collect();
        if let Some(dup) = first_repeat(&entries) {
            return Err(PluginError::EntryPointCollision {
                name: dup.to_owned(),
                plugin: name.to_owned(),
                owner: name.to_owned(),
            });
        }
        for (field, _) in defaults {
            self.fields.insert(field, idx);
        }
        for entry in entries {
            self.entry_points.insert(entry, idx);
        }
        self.plugins.push(Box::new(plugin));
        Ok(())
    }

    /// Names of registered plugins, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.plugins.iter().map(|p| p.name())
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// True when no plugin is registered.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// The union of every plugin's default state.
    pub fn defaults(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for plugin in &self.plugins {
            for (field, value) in plugin.default_state() {
                out.insert(field.to_owned(), value);
            }
        }
        out
    }

    /// True when `field` belongs to a registered plugin.
    pub fn owns_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub(crate) fn run_mutation(
        &self,
        mutation: &str,
        node: &NodeId,
        record: &NodeRecord,
        args: &Value,
    ) -> Result<PluginPatches, PluginError> {
        let plugin = self
            .owner(mutation)
            .filter(|p| p.mutations().iter().any(|m| *m == mutation))
            .ok_or_else(|| PluginError::UnknownMutation(mutation.to_owned()))?;
        let fields = plugin.default_state().into_iter().map(|(f, _)| f).collect();
        let mut patches = PluginPatches::new(plugin.name(), fields);
        plugin.mutate(mutation, node, record, args, &mut patches)?;
        Ok(patches)
    }

    pub(crate) fn run_query(&self, query: &str, record: &NodeRecord, args: &Value) -> Result<Value, PluginError> {
        let plugin = self
            .owner(query)
            .filter(|p| p.queries().iter().any(|q| *q == query))
            .ok_or_else(|| PluginError::UnknownQuery(query.to_owned()))?;
        plugin.query(query, record, args)
    }

    fn owner(&self, entry: &str) -> Option<&dyn NodeDataPlugin> {
        self.entry_points
            .get(entry)
            .and_then(|&idx| self.plugins.get(idx))
            .map(|p| &**p)
    }
}

fn first_repeat<'a>(names: &[&'a str]) -> Option<&'a str> {
    names
        .iter()
        .enumerate()
        .find(|(i, n)| names[..*i].contains(n))
        .map(|(_, n)| *n)
}
