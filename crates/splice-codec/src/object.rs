//! Typed-object shaping: schema-driven mapping between typed JSON values
//! and generic subtrees.
//!
//! Encoding is eager and synchronous; a typed value that does not fit the
//! schema shape fails immediately. The shape conventions are the binding
//! contract: fields named after schema children, lists as arrays of entry
//! objects, a choice as a one-field object naming the active case, and
//! augmentation children under a field named after the augmentation class.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use splice_schema::{NodeKind, SchemaNode, SchemaSnapshot};
use splice_types::{
    ClassId, GenericNode, GenericPath, GenericStep, Scalar, TypedObject, TypedPath,
};

use crate::error::{CodecError, CodecResult};
use crate::path::{resolve_typed, SchemaCtx};

/// Encode a typed object at a typed path into a generic subtree.
///
/// Returns the generic path alongside the encoded node so callers can hand
/// both straight to a write transaction.
pub fn encode_object(
    snapshot: &SchemaSnapshot,
    path: &TypedPath,
    object: &TypedObject,
) -> CodecResult<(GenericPath, GenericNode)> {
    if path.is_wildcarded() {
        return Err(CodecError::InvalidPath(format!(
            "wildcarded path {path} cannot address an object"
        )));
    }
    let target_class = path
        .target_class()
        .ok_or_else(|| CodecError::InvalidPath("empty path".to_string()))?;
    if target_class != object.class() {
        return Err(CodecError::Serialization(format!(
            "object class {} does not match path target {target_class}",
            object.class()
        )));
    }
    let resolved = resolve_typed(snapshot, path)?;
    let mut node = resolved
        .target_shell()
        .cloned()
        .ok_or_else(|| CodecError::InvalidPath("empty path".to_string()))?;
    fill_children(&mut node, resolved.target, object.value())?;
    Ok((resolved.generic_path(), node))
}

/// Decode a generic subtree at a typed path back into a typed object.
pub fn decode_object(
    snapshot: &SchemaSnapshot,
    path: &TypedPath,
    node: &GenericNode,
) -> CodecResult<TypedObject> {
    if path.is_wildcarded() {
        return Err(CodecError::InvalidPath(format!(
            "wildcarded path {path} cannot address an object"
        )));
    }
    let class = path
        .target_class()
        .cloned()
        .ok_or_else(|| CodecError::InvalidPath("empty path".to_string()))?;
    let resolved = resolve_typed(snapshot, path)?;
    if let Some((step, _)) = resolved.segments.last() {
        if &node.step() != step {
            return Err(CodecError::Deserialization(format!(
                "node {} does not sit at path {path}",
                node.step()
            )));
        }
    }
    let children = node.children().ok_or_else(|| {
        CodecError::Deserialization(format!("node {} carries no children", node.step()))
    })?;
    let value = decode_children(resolved.target, children)?;
    Ok(TypedObject::new(class, value))
}

/// Default-empty nodes for every ancestor of a typed path, root to leaf.
///
/// Merging these before a write guarantees the parents a strict store
/// requires; an empty result means the target sits at the root.
pub fn default_ancestors(
    snapshot: &SchemaSnapshot,
    path: &TypedPath,
) -> CodecResult<Vec<(GenericPath, GenericNode)>> {
    let resolved = resolve_typed(snapshot, path)?;
    let mut out = Vec::new();
    let mut prefix = GenericPath::root();
    let segments = &resolved.segments;
    for (step, shell) in &segments[..segments.len().saturating_sub(1)] {
        prefix.push(step.clone());
        out.push((prefix.clone(), shell.clone()));
    }
    Ok(out)
}

/// Encode a typed value into the children of an already-shelled node.
pub(crate) fn fill_children(
    target: &mut GenericNode,
    ctx: SchemaCtx<'_>,
    value: &Value,
) -> CodecResult<()> {
    let fields = value.as_object().ok_or_else(|| {
        CodecError::Serialization(format!("expected an object for {}", ctx.label()))
    })?;
    for (name, field) in fields {
        if let Some(child) = ctx.child_by_name(name) {
            let encoded = encode_node(child, field)?;
            target
                .set_child(encoded)
                .map_err(|e| CodecError::Serialization(e.to_string()))?;
        } else if let Some(aug) = ctx.augmentation_by_class(&ClassId::new(name.clone())) {
            let mut layer = GenericNode::augmentation(aug.children().keys().cloned());
            fill_children(&mut layer, SchemaCtx::Augmentation(aug), field)?;
            target
                .set_child(layer)
                .map_err(|e| CodecError::Serialization(e.to_string()))?;
        } else {
            return Err(CodecError::Serialization(format!(
                "unknown field {name} under {}",
                ctx.label()
            )));
        }
    }
    Ok(())
}

fn encode_node(schema: &Arc<SchemaNode>, value: &Value) -> CodecResult<GenericNode> {
    let id = schema.id().clone();
    match schema.kind() {
        NodeKind::Leaf => {
            let scalar = Scalar::from_json(value)
                .map_err(|e| CodecError::Serialization(format!("leaf {id}: {e}")))?;
            Ok(GenericNode::leaf(id, scalar))
        }
        NodeKind::LeafList => {
            let items = value.as_array().ok_or_else(|| {
                CodecError::Serialization(format!("leaf-list {id} expects an array"))
            })?;
            let values = items
                .iter()
                .map(|v| {
                    Scalar::from_json(v)
                        .map_err(|e| CodecError::Serialization(format!("leaf-list {id}: {e}")))
                })
                .collect::<CodecResult<Vec<_>>>()?;
            Ok(GenericNode::leaf_list(id, values))
        }
        NodeKind::AnyData => Ok(GenericNode::any_data(id, value.clone())),
        NodeKind::Container | NodeKind::Case => {
            let mut node = GenericNode::container(id);
            fill_children(&mut node, SchemaCtx::Node(schema), value)?;
            Ok(node)
        }
        NodeKind::Choice => {
            let cases = value.as_object().ok_or_else(|| {
                CodecError::Serialization(format!("choice {id} expects an object"))
            })?;
            if cases.len() != 1 {
                return Err(CodecError::Serialization(format!(
                    "choice {id} must carry exactly one active case, found {}",
                    cases.len()
                )));
            }
            let (case_name, case_value) = cases
                .iter()
                .next()
                .ok_or_else(|| CodecError::Serialization(format!("choice {id} is empty")))?;
            let case = schema.child_by_name(case_name).ok_or_else(|| {
                CodecError::Serialization(format!("unknown case {case_name} of choice {id}"))
            })?;
            let mut case_node = GenericNode::choice(case.id().clone());
            fill_children(&mut case_node, SchemaCtx::Node(case), case_value)?;
            let mut choice_node = GenericNode::choice(id);
            choice_node
                .set_child(case_node)
                .map_err(|e| CodecError::Serialization(e.to_string()))?;
            Ok(choice_node)
        }
        NodeKind::List { keys } => {
            let items = value.as_array().ok_or_else(|| {
                CodecError::Serialization(format!("list {id} expects an array of entries"))
            })?;
            let mut list = GenericNode::list(id.clone());
            for item in items {
                let fields = item.as_object().ok_or_else(|| {
                    CodecError::Serialization(format!("list {id} entries must be objects"))
                })?;
                let mut key_map: BTreeMap<String, Scalar> = BTreeMap::new();
                for key in keys {
                    let raw = fields.get(key).ok_or_else(|| {
                        CodecError::Serialization(format!("entry of {id} misses key leaf {key}"))
                    })?;
                    let scalar = Scalar::from_json(raw)
                        .map_err(|e| CodecError::Serialization(format!("key {key}: {e}")))?;
                    key_map.insert(key.clone(), scalar);
                }
                let mut entry = GenericNode::list_entry(id.clone(), key_map);
                fill_children(&mut entry, SchemaCtx::Node(schema), item)?;
                list.set_child(entry)
                    .map_err(|e| CodecError::Serialization(e.to_string()))?;
            }
            Ok(list)
        }
    }
}

fn decode_node(schema: &Arc<SchemaNode>, node: &GenericNode) -> CodecResult<Value> {
    match (schema.kind(), node) {
        (NodeKind::Leaf, GenericNode::Leaf { value, .. }) => Ok(value.to_json()),
        (NodeKind::LeafList, GenericNode::LeafList { values, .. }) => {
            Ok(Value::Array(values.iter().map(Scalar::to_json).collect()))
        }
        (NodeKind::AnyData, GenericNode::AnyData { body, .. }) => Ok(body.clone()),
        (NodeKind::Container | NodeKind::Case, GenericNode::Container { children, .. }) => {
            decode_children(SchemaCtx::Node(schema), children)
        }
        (NodeKind::List { .. }, GenericNode::List { entries, .. }) => {
            let items = entries
                .iter()
                .map(|entry| match entry {
                    GenericNode::ListEntry { children, .. } => {
                        decode_children(SchemaCtx::Node(schema), children)
                    }
                    other => Err(CodecError::Deserialization(format!(
                        "list {} holds a non-entry node {}",
                        schema.id(),
                        other.step()
                    ))),
                })
                .collect::<CodecResult<Vec<_>>>()?;
            Ok(Value::Array(items))
        }
        (NodeKind::Choice, GenericNode::Choice { children, .. }) => {
            if children.len() != 1 {
                return Err(CodecError::Deserialization(format!(
                    "choice {} carries {} active cases",
                    schema.id(),
                    children.len()
                )));
            }
            let (step, case_node) = children.iter().next().ok_or_else(|| {
                CodecError::Deserialization(format!("choice {} is empty", schema.id()))
            })?;
            let case = step
                .node_id()
                .and_then(|id| schema.child(id))
                .ok_or_else(|| {
                    CodecError::Deserialization(format!(
                        "unknown case {step} of choice {}",
                        schema.id()
                    ))
                })?;
            let case_children = case_node.children().ok_or_else(|| {
                CodecError::Deserialization(format!("case {step} carries no children"))
            })?;
            let inner = decode_children(SchemaCtx::Node(case), case_children)?;
            let mut map = serde_json::Map::new();
            map.insert(case.id().name().to_string(), inner);
            Ok(Value::Object(map))
        }
        (kind, node) => Err(CodecError::Deserialization(format!(
            "node {} does not match schema shape {kind:?}",
            node.step()
        ))),
    }
}

pub(crate) fn decode_children(
    ctx: SchemaCtx<'_>,
    children: &BTreeMap<GenericStep, GenericNode>,
) -> CodecResult<Value> {
    let mut map = serde_json::Map::new();
    for (step, child) in children {
        match step {
            GenericStep::Node(id) => {
                let schema_child = ctx
                    .child(id)
                    .ok_or_else(|| CodecError::Deserialization(format!("unknown node {id}")))?;
                map.insert(id.name().to_string(), decode_node(schema_child, child)?);
            }
            GenericStep::Augmentation(_) => {
                let aug = ctx.augmentation_matching(step).ok_or_else(|| {
                    CodecError::Deserialization(format!("unknown augmentation layer {step}"))
                })?;
                let aug_children = child.children().ok_or_else(|| {
                    CodecError::Deserialization("augmentation layer carries no children".into())
                })?;
                map.insert(
                    aug.class().to_string(),
                    decode_children(SchemaCtx::Augmentation(aug), aug_children)?,
                );
            }
            other => {
                return Err(CodecError::Deserialization(format!(
                    "unexpected child step {other}"
                )))
            }
        }
    }
    Ok(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use splice_schema::SchemaBuilder;
    use splice_types::{ListKey, NodeId};

    fn snapshot() -> Arc<SchemaSnapshot> {
        SchemaBuilder::new("net", 1)
            .container("nodes", |c| {
                c.class("Nodes").list("node", &["name"], |l| {
                    l.class("Node")
                        .leaf("name")
                        .leaf("mtu")
                        .leaf_list("tags")
                        .container("stats", |s| s.class("NodeStats").leaf("rx"))
                        .choice("transport", |ch| {
                            ch.case("tcp", |case| {
                                case.container("tcp", |t| t.class("TcpTransport").leaf("port"))
                            })
                            .case("tls", |case| {
                                case.container("tls", |t| t.class("TlsTransport").leaf("cert"))
                            })
                        })
                        .augment("NodeMeta", |a| {
                            a.container("meta", |m| m.class("Meta").leaf("owner"))
                        })
                })
            })
            .build()
    }

    fn nid(name: &str) -> NodeId {
        NodeId::new("net", name)
    }

    fn entry_path() -> TypedPath {
        TypedPath::of("Nodes").entry("Node", ListKey::single("name", "n1"))
    }

    #[test]
    fn encodes_list_entry_object() {
        let snap = snapshot();
        let object = TypedObject::new("Node", json!({"name": "n1", "mtu": 1500}));
        let (path, node) = encode_object(&snap, &entry_path(), &object).unwrap();

        assert_eq!(path.len(), 3);
        let mut expected = GenericNode::list_entry(
            nid("node"),
            [("name".to_string(), Scalar::from("n1"))],
        );
        expected
            .set_child(GenericNode::leaf(nid("mtu"), Scalar::Int(1500)))
            .unwrap();
        assert_eq!(node, expected);
    }

    #[test]
    fn object_roundtrips_through_generic_form() {
        let snap = snapshot();
        let object = TypedObject::new(
            "Node",
            json!({
                "name": "n1",
                "mtu": 1500,
                "tags": ["edge", "lab"],
                "stats": {"rx": 7},
                "transport": {"tcp": {"tcp": {"port": 179}}},
                "NodeMeta": {"meta": {"owner": "core"}}
            }),
        );
        let (_, node) = encode_object(&snap, &entry_path(), &object).unwrap();
        let decoded = decode_object(&snap, &entry_path(), &node).unwrap();
        assert_eq!(decoded, object);
    }

    #[test]
    fn nested_list_roundtrips() {
        let snap = snapshot();
        let object = TypedObject::new(
            "Nodes",
            json!({"node": [
                {"name": "n1", "mtu": 1500},
                {"name": "n2", "mtu": 9000}
            ]}),
        );
        let path = TypedPath::of("Nodes");
        let (_, node) = encode_object(&snap, &path, &object).unwrap();
        let decoded = decode_object(&snap, &path, &node).unwrap();
        assert_eq!(decoded, object);
    }

    #[test]
    fn class_mismatch_fails_serialization() {
        let snap = snapshot();
        let object = TypedObject::new("NodeStats", json!({"rx": 1}));
        assert!(matches!(
            encode_object(&snap, &entry_path(), &object),
            Err(CodecError::Serialization(_))
        ));
    }

    #[test]
    fn unknown_field_fails_serialization() {
        let snap = snapshot();
        let object = TypedObject::new("Node", json!({"name": "n1", "bogus": 1}));
        assert!(matches!(
            encode_object(&snap, &entry_path(), &object),
            Err(CodecError::Serialization(_))
        ));
    }

    #[test]
    fn choice_with_two_cases_fails_serialization() {
        let snap = snapshot();
        let object = TypedObject::new(
            "Node",
            json!({"name": "n1", "transport": {
                "tcp": {"tcp": {"port": 179}},
                "tls": {"tls": {"cert": "x"}}
            }}),
        );
        assert!(matches!(
            encode_object(&snap, &entry_path(), &object),
            Err(CodecError::Serialization(_))
        ));
    }

    #[test]
    fn missing_entry_key_fails_serialization() {
        let snap = snapshot();
        let object = TypedObject::new("Nodes", json!({"node": [{"mtu": 1500}]}));
        assert!(matches!(
            encode_object(&snap, &TypedPath::of("Nodes"), &object),
            Err(CodecError::Serialization(_))
        ));
    }

    #[test]
    fn wildcarded_path_is_rejected() {
        let snap = snapshot();
        let object = TypedObject::new("Node", json!({"name": "n1"}));
        let path = TypedPath::of("Nodes").wildcard("Node");
        assert!(matches!(
            encode_object(&snap, &path, &object),
            Err(CodecError::InvalidPath(_))
        ));
    }

    #[test]
    fn augmentation_target_roundtrips() {
        let snap = snapshot();
        let object = TypedObject::new("NodeMeta", json!({"meta": {"owner": "core"}}));
        let path = entry_path().child("NodeMeta");
        let (generic, node) = encode_object(&snap, &path, &object).unwrap();
        assert!(generic.last().unwrap().is_augmentation());
        let decoded = decode_object(&snap, &path, &node).unwrap();
        assert_eq!(decoded, object);
    }

    #[test]
    fn default_ancestors_cover_every_generic_hop() {
        let snap = snapshot();
        let path = entry_path().child("NodeStats");
        let ancestors = default_ancestors(&snap, &path).unwrap();

        let kinds: Vec<String> = ancestors
            .iter()
            .map(|(p, _)| p.last().unwrap().to_string())
            .collect();
        assert_eq!(kinds, ["net:nodes", "net:node", "net:node[name=n1]"]);

        assert_eq!(ancestors[0].1, GenericNode::container(nid("nodes")));
        assert_eq!(ancestors[1].1, GenericNode::list(nid("node")));
        assert_eq!(
            ancestors[2].1,
            GenericNode::list_entry(nid("node"), [("name".to_string(), Scalar::from("n1"))])
        );
        // Paths are cumulative, root to leaf.
        assert_eq!(ancestors[2].0.len(), 3);
    }

    #[test]
    fn decoding_foreign_node_fails() {
        let snap = snapshot();
        let node = GenericNode::container(nid("elsewhere"));
        assert!(matches!(
            decode_object(&snap, &entry_path(), &node),
            Err(CodecError::Deserialization(_))
        ));
    }
}
