// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::id::NodeId;
use crate::plugin::{NodeDataPlugin, PluginError, PluginPatches, parse_args};
use crate::record::NodeRecord;

const FIELD: &str = "validations";

/// Severity of a validation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks submission.
    Error,
    /// Shown but does not block.
    Warning,
    /// Informational.
    Info,
    /// Positive confirmation.
    Success,
}

/// One validation result attached to a node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    /// Machine-readable code.
    pub code: String,
    /// Severity.
    pub severity: Severity,
    /// Display message (untranslated key or text).
    pub message: String,
}

/// Per-node validation results.
///
/// - field `validations`: list of [`Validation`], default `[]`
/// - mutations `set_validations` (args: list) and `clear_validations`
/// - queries `validations` and `has_errors`
#[derive(Clone, Copy, Debug, Default)]
pub struct ValidationPlugin;

impl ValidationPlugin {
    fn current(record: &NodeRecord) -> Vec<Validation> {
        record
            .plugin(FIELD)
            .and_then(|v| Vec::<Validation>::deserialize(v).ok())
            .unwrap_or_default()
    }
}

impl NodeDataPlugin for ValidationPlugin {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn default_state(&self) -> Vec<(&'static str, Value)> {
        vec![(FIELD, json!([]))]
    }

    fn mutations(&self) -> &'static [&'static str] {
        &["set_validations", "clear_validations"]
    }

    fn queries(&self) -> &'static [&'static str] {
        &["validations", "has_errors"]
    }

    fn mutate(
        &self,
        mutation: &str,
        node: &NodeId,
        _record: &NodeRecord,
        args: &Value,
        patches: &mut PluginPatches,
    ) -> Result<(), PluginError> {
        let next: Vec<Validation> = match mutation {
            "set_validations" => parse_args(mutation, args)?,
            "clear_validations" => Vec::new(),
            _ => return Err(PluginError::UnknownMutation(mutation.to_owned())),
        };
        let value = serde_json::to_value(next).map_err(|err| PluginError::InvalidArgs {
            name: mutation.to_owned(),
            reason: err.to_string(),
        })?;
        patches.set_field(node, FIELD, value)
    }

    fn query(&self, query: &str, record: &NodeRecord, _args: &Value) -> Result<Value, PluginError> {
        match query {
            "validations" => Ok(record.plugin(FIELD).cloned().unwrap_or_else(|| json!([]))),
            "has_errors" => Ok(Value::Bool(
                Self::current(record)
                    .iter()
                    .any(|v| v.severity == Severity::Error),
            )),
            _ => Err(PluginError::UnknownQuery(query.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{PageKey, ParentRef};

    fn record(validations: Value) -> NodeRecord {
        let mut record = NodeRecord::new("Input", PageKey::from("P"), ParentRef::Page(PageKey::from("P")));
        record.plugins.insert(FIELD.into(), validations);
        record
    }

    #[test]
    fn has_errors_only_counts_error_severity() {
        let warn = record(json!([{ "code": "w", "severity": "warning", "message": "m" }]));
        let err = record(json!([{ "code": "e", "severity": "error", "message": "m" }]));
        let plugin = ValidationPlugin;
        assert_eq!(plugin.query("has_errors", &warn, &Value::Null), Ok(json!(false)));
        assert_eq!(plugin.query("has_errors", &err, &Value::Null), Ok(json!(true)));
    }

    #[test]
    fn set_validations_rejects_malformed_args() {
        let plugin = ValidationPlugin;
        let node = NodeId::new("N");
        let mut patches = PluginPatches::new("validation", vec![FIELD]);
        let err = plugin
            .mutate("set_validations", &node, &record(json!([])), &json!([{ "code": 1 }]), &mut patches)
            .unwrap_err();
        assert!(matches!(err, PluginError::InvalidArgs { .. }));
        assert!(patches.is_empty());
    }
}
