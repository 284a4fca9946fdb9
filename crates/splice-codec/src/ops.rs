//! RPC and notification codecs.
//!
//! The same value shaping as the data tree, specialized to the implicit
//! input/output containers of an RPC definition and to notification bodies.

use std::sync::Arc;

use splice_schema::{SchemaNode, SchemaSnapshot};
use splice_types::{ClassId, GenericNode, NodeId, TypedObject};

use crate::error::{CodecError, CodecResult};
use crate::object::{decode_children, fill_children};
use crate::path::SchemaCtx;

/// Encode an RPC input object into its implicit input container.
pub fn encode_rpc_input(
    snapshot: &SchemaSnapshot,
    rpc: &NodeId,
    input: &TypedObject,
) -> CodecResult<GenericNode> {
    let def = rpc_def(snapshot, rpc)?;
    let container = def.input().ok_or_else(|| {
        CodecError::Serialization(format!("operation {rpc} takes no input"))
    })?;
    encode_body(container, input)
}

/// Decode a generic input container back into the typed input object.
pub fn decode_rpc_input(
    snapshot: &SchemaSnapshot,
    rpc: &NodeId,
    node: &GenericNode,
) -> CodecResult<TypedObject> {
    let def = rpc_def(snapshot, rpc)?;
    let container = def.input().ok_or_else(|| {
        CodecError::Deserialization(format!("operation {rpc} takes no input"))
    })?;
    decode_body(container, node)
}

/// Encode an RPC output object into its implicit output container.
pub fn encode_rpc_output(
    snapshot: &SchemaSnapshot,
    rpc: &NodeId,
    output: &TypedObject,
) -> CodecResult<GenericNode> {
    let def = rpc_def(snapshot, rpc)?;
    let container = def.output().ok_or_else(|| {
        CodecError::Serialization(format!("operation {rpc} produces no output"))
    })?;
    encode_body(container, output)
}

/// Decode a generic output container back into the typed output object.
pub fn decode_rpc_output(
    snapshot: &SchemaSnapshot,
    rpc: &NodeId,
    node: &GenericNode,
) -> CodecResult<TypedObject> {
    let def = rpc_def(snapshot, rpc)?;
    let container = def.output().ok_or_else(|| {
        CodecError::Deserialization(format!("operation {rpc} produces no output"))
    })?;
    decode_body(container, node)
}

/// Encode a typed notification, returning its schema path and body.
pub fn encode_notification(
    snapshot: &SchemaSnapshot,
    notification: &TypedObject,
) -> CodecResult<(NodeId, GenericNode)> {
    let def = snapshot
        .notification_for_class(notification.class())
        .ok_or_else(|| {
            CodecError::InvalidPath(format!(
                "no notification for class {}",
                notification.class()
            ))
        })?;
    let body = encode_body(def.body(), notification)?;
    Ok((def.id().clone(), body))
}

/// Decode a generic notification body back into the typed object.
pub fn decode_notification(
    snapshot: &SchemaSnapshot,
    id: &NodeId,
    node: &GenericNode,
) -> CodecResult<TypedObject> {
    let def = snapshot
        .notification(id)
        .ok_or_else(|| CodecError::Deserialization(format!("unknown notification {id}")))?;
    decode_body(def.body(), node)
}

/// Resolve the schema path a notification class publishes at.
///
/// Listener registration translates supported classes exactly once through
/// this.
pub fn notification_path(snapshot: &SchemaSnapshot, class: &ClassId) -> CodecResult<NodeId> {
    snapshot
        .notification_for_class(class)
        .map(|def| def.id().clone())
        .ok_or_else(|| CodecError::InvalidPath(format!("no notification for class {class}")))
}

fn rpc_def<'a>(
    snapshot: &'a SchemaSnapshot,
    rpc: &NodeId,
) -> CodecResult<&'a splice_schema::RpcDef> {
    snapshot
        .rpc(rpc)
        .ok_or_else(|| CodecError::InvalidPath(format!("unknown operation {rpc}")))
}

fn encode_body(container: &Arc<SchemaNode>, object: &TypedObject) -> CodecResult<GenericNode> {
    if let Some(expected) = container.class() {
        if expected != object.class() {
            return Err(CodecError::Serialization(format!(
                "object class {} does not match {expected}",
                object.class()
            )));
        }
    }
    let mut node = GenericNode::container(container.id().clone());
    fill_children(&mut node, SchemaCtx::Node(container), object.value())?;
    Ok(node)
}

fn decode_body(container: &Arc<SchemaNode>, node: &GenericNode) -> CodecResult<TypedObject> {
    let class = container.class().cloned().ok_or_else(|| {
        CodecError::Deserialization(format!("container {} has no typed class", container.id()))
    })?;
    let children = node.children().ok_or_else(|| {
        CodecError::Deserialization(format!("node {} carries no children", node.step()))
    })?;
    let value = decode_children(SchemaCtx::Node(container), children)?;
    Ok(TypedObject::new(class, value))
}
