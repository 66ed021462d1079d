// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::id::NodeId;
use crate::plugin::{NodeDataPlugin, PluginError, PluginPatches, parse_args};
use crate::record::NodeRecord;

const FIELD: &str = "attachments";

/// An attachment tracked on a node.
///
/// While an upload is in flight the attachment is keyed by its temporary id;
/// once fulfilled it is re-keyed by the id the backend assigned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Original file name.
    pub filename: String,
    /// Size in bytes, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// True once the backend accepted the upload.
    #[serde(default)]
    pub uploaded: bool,
    /// Failure message of a rejected upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Attachment {
    fn is_pending(&self) -> bool {
        !self.uploaded && self.error.is_none()
    }
}

#[derive(Deserialize)]
struct UploadArgs {
    temp_id: String,
    filename: String,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Deserialize)]
struct FulfilledArgs {
    temp_id: String,
    id: String,
}

#[derive(Deserialize)]
struct RejectedArgs {
    temp_id: String,
    error: String,
}

#[derive(Deserialize)]
struct RemoveArgs {
    id: String,
}

/// Per-node attachment tracking.
///
/// - field `attachments`: map from (temporary or final) id to [`Attachment`], default `{}`
/// - mutations `attachment_upload`, `attachment_upload_fulfilled`,
///   `attachment_upload_rejected`, `attachment_remove`
/// - queries `attachments` and `has_pending`
///
/// Mutations that reference an unknown id queue nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct AttachmentsPlugin;

type Attachments = BTreeMap<String, Attachment>;

fn current(record: &NodeRecord) -> Attachments {
    record
        .plugin(FIELD)
        .and_then(|v| Attachments::deserialize(v).ok())
        .unwrap_or_default()
}

impl NodeDataPlugin for AttachmentsPlugin {
    fn name(&self) -> &'static str {
        "attachments"
    }

    fn default_state(&self) -> Vec<(&'static str, Value)> {
        vec![(FIELD, json!({}))]
    }

    fn mutations(&self) -> &'static [&'static str] {
        &[
            "attachment_upload",
            "attachment_upload_fulfilled",
            "attachment_upload_rejected",
            "attachment_remove",
        ]
    }

    fn queries(&self) -> &'static [&'static str] {
        &["attachments", "has_pending"]
    }

    fn mutate(
        &self,
        mutation: &str,
        node: &NodeId,
        record: &NodeRecord,
        args: &Value,
        patches: &mut PluginPatches,
    ) -> Result<(), PluginError> {
        let mut attachments = current(record);
        let changed = match mutation {
            "attachment_upload" => {
                let args: UploadArgs = parse_args(mutation, args)?;
                attachments.insert(
                    args.temp_id,
                    Attachment {
                        filename: args.filename,
                        size: args.size,
                        uploaded: false,
                        error: None,
                    },
                );
                true
            }
            "attachment_upload_fulfilled" => {
                let args: FulfilledArgs = parse_args(mutation, args)?;
                match attachments.remove(&args.temp_id) {
                    Some(mut attachment) => {
                        attachment.uploaded = true;
                        attachments.insert(args.id, attachment);
                        true
                    }
                    None => false,
                }
            }
            "attachment_upload_rejected" => {
                let args: RejectedArgs = parse_args(mutation, args)?;
                match attachments.get_mut(&args.temp_id) {
                    Some(attachment) => {
                        attachment.error = Some(args.error);
                        true
                    }
                    None => false,
                }
            }
            "attachment_remove" => {
                let args: RemoveArgs = parse_args(mutation, args)?;
                attachments.remove(&args.id).is_some()
            }
            _ => return Err(PluginError::UnknownMutation(mutation.to_owned())),
        };
        if !changed {
            return Ok(());
        }
        let value = serde_json::to_value(attachments).map_err(|err| PluginError::InvalidArgs {
            name: mutation.to_owned(),
            reason: err.to_string(),
        })?;
        patches.set_field(node, FIELD, value)
    }

    fn query(&self, query: &str, record: &NodeRecord, _args: &Value) -> Result<Value, PluginError> {
        match query {
            "attachments" => Ok(record.plugin(FIELD).cloned().unwrap_or_else(|| json!({}))),
            "has_pending" => Ok(Value::Bool(
                current(record).values().any(Attachment::is_pending),
            )),
            _ => Err(PluginError::UnknownQuery(query.to_owned())),
        }
    }
}
