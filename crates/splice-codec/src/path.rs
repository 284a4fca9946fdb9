//! Typed-path resolution against one schema snapshot.
//!
//! The typed and generic address spaces differ in shape: choice and case
//! layers are invisible to typed callers, keyed list entries collapse into
//! one typed step, and augmentations are addressed by class. Every encode
//! walks the typed steps through the schema, emitting the generic steps the
//! store needs; every decode is the inverse walk, skipping invisible layers.

use std::sync::Arc;

use splice_schema::{AugmentationSchema, ClassTarget, NodeKind, SchemaNode, SchemaSnapshot};
use splice_types::{
    ClassId, GenericNode, GenericPath, GenericStep, NodeId, TypedPath, TypedStep,
};

use crate::error::{CodecError, CodecResult};

/// Schema context a typed step resolves within: either a regular node or an
/// augmentation layer.
#[derive(Clone, Copy)]
pub(crate) enum SchemaCtx<'a> {
    Node(&'a Arc<SchemaNode>),
    Augmentation(&'a AugmentationSchema),
}

impl<'a> SchemaCtx<'a> {
    pub(crate) fn find_class(self, class: &ClassId) -> Option<ClassTarget<'a>> {
        match self {
            SchemaCtx::Node(node) => node.find_class(class),
            SchemaCtx::Augmentation(aug) => aug.find_class(class),
        }
    }

    pub(crate) fn child(self, id: &NodeId) -> Option<&'a Arc<SchemaNode>> {
        match self {
            SchemaCtx::Node(node) => node.child(id),
            SchemaCtx::Augmentation(aug) => aug.child(id),
        }
    }

    pub(crate) fn child_by_name(self, name: &str) -> Option<&'a Arc<SchemaNode>> {
        match self {
            SchemaCtx::Node(node) => node.child_by_name(name),
            SchemaCtx::Augmentation(aug) => aug.child_by_name(name),
        }
    }

    /// Augmentation layer matching a generic augmentation step.
    pub(crate) fn augmentation_matching(
        self,
        step: &GenericStep,
    ) -> Option<&'a AugmentationSchema> {
        match self {
            SchemaCtx::Node(node) => node.augmentations().iter().find(|a| &a.step() == step),
            SchemaCtx::Augmentation(_) => None,
        }
    }

    pub(crate) fn augmentation_by_class(self, class: &ClassId) -> Option<&'a AugmentationSchema> {
        match self {
            SchemaCtx::Node(node) => node.augmentation_by_class(class),
            SchemaCtx::Augmentation(_) => None,
        }
    }

    pub(crate) fn label(self) -> String {
        match self {
            SchemaCtx::Node(node) => node.id().to_string(),
            SchemaCtx::Augmentation(aug) => aug.class().to_string(),
        }
    }
}

/// A typed path resolved against a snapshot: the generic steps it encodes
/// to, each paired with the default-empty node for its position, plus the
/// schema context of the target.
pub(crate) struct ResolvedPath<'a> {
    pub(crate) segments: Vec<(GenericStep, GenericNode)>,
    pub(crate) target: SchemaCtx<'a>,
}

impl ResolvedPath<'_> {
    pub(crate) fn generic_path(&self) -> GenericPath {
        self.segments.iter().map(|(step, _)| step.clone()).collect()
    }

    /// The default-empty shell of the target node itself.
    pub(crate) fn target_shell(&self) -> Option<&GenericNode> {
        self.segments.last().map(|(_, shell)| shell)
    }
}

/// Resolve a typed path, emitting generic steps.
///
/// Wildcard steps resolve to the whole-list node (listener scopes register
/// at the list); direct reads and writes must reject wildcarded paths
/// before calling in.
pub(crate) fn resolve_typed<'a>(
    snapshot: &'a SchemaSnapshot,
    path: &TypedPath,
) -> CodecResult<ResolvedPath<'a>> {
    let mut ctx = SchemaCtx::Node(snapshot.root());
    let mut segments: Vec<(GenericStep, GenericNode)> = Vec::new();

    for step in path.steps() {
        let class = step.class();
        let target = ctx.find_class(class).ok_or_else(|| {
            CodecError::InvalidPath(format!("class {class} not found under {}", ctx.label()))
        })?;
        match target {
            ClassTarget::Node { prefix, node } => {
                let is_list = matches!(node.kind(), NodeKind::List { .. });
                match step {
                    TypedStep::Item(_) => {
                        if is_list {
                            return Err(CodecError::InvalidPath(format!(
                                "list class {class} requires an entry key or wildcard"
                            )));
                        }
                        push_prefix(&mut segments, &prefix, node)?;
                    }
                    TypedStep::Wildcard(_) => {
                        if !is_list {
                            return Err(CodecError::InvalidPath(format!(
                                "wildcard step on non-list class {class}"
                            )));
                        }
                        push_prefix(&mut segments, &prefix, node)?;
                    }
                    TypedStep::Entry { key, .. } => {
                        let schema_keys = node.list_keys();
                        if schema_keys.is_empty() {
                            return Err(CodecError::InvalidPath(format!(
                                "class {class} is not a keyed list"
                            )));
                        }
                        for name in schema_keys {
                            if key.get(name).is_none() {
                                return Err(CodecError::InvalidPath(format!(
                                    "missing key leaf {name} for class {class}"
                                )));
                            }
                        }
                        if key.as_map().len() != schema_keys.len() {
                            return Err(CodecError::InvalidPath(format!(
                                "unexpected key leaves for class {class}"
                            )));
                        }
                        push_prefix(&mut segments, &prefix, node)?;
                        let id = node.id().clone();
                        let keys = key.as_map().clone();
                        segments.push((
                            GenericStep::ListEntry {
                                id: id.clone(),
                                keys: keys.clone(),
                            },
                            GenericNode::list_entry(id, keys),
                        ));
                    }
                }
                ctx = SchemaCtx::Node(node);
            }
            ClassTarget::Augmentation(aug) => {
                if !matches!(step, TypedStep::Item(_)) {
                    return Err(CodecError::InvalidPath(format!(
                        "augmentation class {class} cannot take a key"
                    )));
                }
                segments.push((
                    aug.step(),
                    GenericNode::augmentation(aug.children().keys().cloned()),
                ));
                ctx = SchemaCtx::Augmentation(aug);
            }
        }
    }

    Ok(ResolvedPath { segments, target: ctx })
}

/// Append the invisible choice/case steps of a class-resolution prefix,
/// then the target node's own step.
fn push_prefix(
    segments: &mut Vec<(GenericStep, GenericNode)>,
    prefix: &[GenericStep],
    node: &SchemaNode,
) -> CodecResult<()> {
    for step in &prefix[..prefix.len() - 1] {
        // Choice and case layers materialize as invisible container nodes.
        let id = step
            .node_id()
            .cloned()
            .unwrap_or_else(|| node.id().clone());
        segments.push((step.clone(), GenericNode::choice(id)));
    }
    let own = prefix[prefix.len() - 1].clone();
    let shell = match node.kind() {
        NodeKind::Container => GenericNode::container(node.id().clone()),
        NodeKind::List { .. } => GenericNode::list(node.id().clone()),
        other => {
            return Err(CodecError::InvalidPath(format!(
                "node {} ({other:?}) does not address a typed object",
                node.id()
            )))
        }
    };
    segments.push((own, shell));
    Ok(())
}

/// Encode a typed path into the generic address space.
pub fn encode_path(snapshot: &SchemaSnapshot, path: &TypedPath) -> CodecResult<GenericPath> {
    Ok(resolve_typed(snapshot, path)?.generic_path())
}

/// Decode a generic path into the typed address space.
///
/// Invisible layers are skipped; a path whose target has no typed
/// counterpart (leaf, whole list, choice layer) fails with
/// [`CodecError::Deserialization`]. Batch callers skip, not abort, on
/// that error.
pub fn decode_path(snapshot: &SchemaSnapshot, path: &GenericPath) -> CodecResult<TypedPath> {
    let mut ctx = SchemaCtx::Node(snapshot.root());
    let mut steps: Vec<TypedStep> = Vec::new();
    let mut last_emitted = true;

    for gstep in path.steps() {
        last_emitted = false;
        match gstep {
            GenericStep::Node(id) => {
                let child = ctx
                    .child(id)
                    .ok_or_else(|| CodecError::Deserialization(format!("unknown node {id}")))?;
                match child.kind() {
                    NodeKind::Choice | NodeKind::Case | NodeKind::List { .. } => {
                        // Invisible layer: the entry step (if any) emits.
                    }
                    NodeKind::Container => {
                        let class = child.class().ok_or_else(|| {
                            CodecError::Deserialization(format!(
                                "container {id} has no typed counterpart"
                            ))
                        })?;
                        steps.push(TypedStep::Item(class.clone()));
                        last_emitted = true;
                    }
                    _ => {
                        return Err(CodecError::Deserialization(format!(
                            "node {id} has no typed counterpart"
                        )))
                    }
                }
                ctx = SchemaCtx::Node(child);
            }
            GenericStep::ListEntry { id, keys } => {
                let list = match ctx {
                    SchemaCtx::Node(node)
                        if node.id() == id && matches!(node.kind(), NodeKind::List { .. }) =>
                    {
                        node
                    }
                    _ => ctx.child(id).ok_or_else(|| {
                        CodecError::Deserialization(format!("unknown list {id}"))
                    })?,
                };
                if list.list_keys().is_empty() {
                    return Err(CodecError::Deserialization(format!(
                        "keyless list {id} entries have no typed counterpart"
                    )));
                }
                let class = list.class().ok_or_else(|| {
                    CodecError::Deserialization(format!("list {id} has no typed counterpart"))
                })?;
                steps.push(TypedStep::Entry {
                    class: class.clone(),
                    key: keys.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                });
                last_emitted = true;
                ctx = SchemaCtx::Node(list);
            }
            GenericStep::LeafListEntry { id, .. } => {
                return Err(CodecError::Deserialization(format!(
                    "leaf-list entry {id} has no typed counterpart"
                )))
            }
            GenericStep::Augmentation(_) => {
                let aug = ctx.augmentation_matching(gstep).ok_or_else(|| {
                    CodecError::Deserialization(format!("unknown augmentation layer {gstep}"))
                })?;
                steps.push(TypedStep::Item(aug.class().clone()));
                last_emitted = true;
                ctx = SchemaCtx::Augmentation(aug);
            }
        }
    }

    if !last_emitted {
        return Err(CodecError::Deserialization(format!(
            "path {path} targets a node with no typed counterpart"
        )));
    }
    Ok(TypedPath::new(steps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_schema::SchemaBuilder;
    use splice_types::{ListKey, Scalar};

    fn snapshot() -> Arc<SchemaSnapshot> {
        SchemaBuilder::new("net", 1)
            .container("nodes", |c| {
                c.class("Nodes").list("node", &["name"], |l| {
                    l.class("Node")
                        .leaf("name")
                        .leaf("mtu")
                        .container("stats", |s| s.class("NodeStats").leaf("rx"))
                        .choice("transport", |ch| {
                            ch.case("tcp", |case| {
                                case.container("tcp", |t| t.class("TcpTransport").leaf("port"))
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
    fn encodes_list_entry_path() {
        let snap = snapshot();
        let generic = encode_path(&snap, &entry_path()).unwrap();
        assert_eq!(
            generic,
            GenericPath::new([
                GenericStep::Node(nid("nodes")),
                GenericStep::Node(nid("node")),
                GenericStep::list_entry(nid("node"), [("name".to_string(), Scalar::from("n1"))]),
            ])
        );
    }

    #[test]
    fn encodes_through_choice_layers() {
        let snap = snapshot();
        let path = entry_path().child("TcpTransport");
        let generic = encode_path(&snap, &path).unwrap();
        let names: Vec<String> = generic.steps().iter().map(|s| s.to_string()).collect();
        assert_eq!(
            names,
            [
                "net:nodes",
                "net:node",
                "net:node[name=n1]",
                "net:transport",
                "net:tcp",
                "net:tcp",
            ]
        );
    }

    #[test]
    fn encodes_augmentation_step() {
        let snap = snapshot();
        let path = entry_path().child("NodeMeta").child("Meta");
        let generic = encode_path(&snap, &path).unwrap();
        assert!(generic.steps()[3].is_augmentation());
        assert_eq!(generic.steps()[4], GenericStep::Node(nid("meta")));
    }

    #[test]
    fn wildcard_encodes_to_whole_list() {
        let snap = snapshot();
        let path = TypedPath::of("Nodes").wildcard("Node");
        let generic = encode_path(&snap, &path).unwrap();
        assert_eq!(
            generic,
            GenericPath::new([
                GenericStep::Node(nid("nodes")),
                GenericStep::Node(nid("node")),
            ])
        );
    }

    #[test]
    fn unknown_class_is_invalid_path() {
        let snap = snapshot();
        let err = encode_path(&snap, &TypedPath::of("Absent")).unwrap_err();
        assert!(matches!(err, CodecError::InvalidPath(_)));
    }

    #[test]
    fn item_step_on_list_class_is_invalid() {
        let snap = snapshot();
        let err = encode_path(&snap, &TypedPath::of("Nodes").child("Node")).unwrap_err();
        assert!(matches!(err, CodecError::InvalidPath(_)));
    }

    #[test]
    fn entry_with_wrong_key_leaf_is_invalid() {
        let snap = snapshot();
        let path = TypedPath::of("Nodes").entry("Node", ListKey::single("id", "n1"));
        assert!(matches!(
            encode_path(&snap, &path),
            Err(CodecError::InvalidPath(_))
        ));
    }

    #[test]
    fn decode_inverts_encode() {
        let snap = snapshot();
        for path in [
            TypedPath::of("Nodes"),
            entry_path(),
            entry_path().child("NodeStats"),
            entry_path().child("TcpTransport"),
            entry_path().child("NodeMeta"),
            entry_path().child("NodeMeta").child("Meta"),
        ] {
            let generic = encode_path(&snap, &path).unwrap();
            let decoded = decode_path(&snap, &generic).unwrap();
            assert_eq!(decoded, path, "path {path} did not round trip");
            assert_eq!(encode_path(&snap, &decoded).unwrap(), generic);
        }
    }

    #[test]
    fn decode_rejects_leaf_target() {
        let snap = snapshot();
        let mut generic = encode_path(&snap, &entry_path()).unwrap();
        generic.push(GenericStep::Node(nid("mtu")));
        assert!(matches!(
            decode_path(&snap, &generic),
            Err(CodecError::Deserialization(_))
        ));
    }

    #[test]
    fn decode_rejects_whole_list_target() {
        let snap = snapshot();
        let generic = GenericPath::new([
            GenericStep::Node(nid("nodes")),
            GenericStep::Node(nid("node")),
        ]);
        assert!(matches!(
            decode_path(&snap, &generic),
            Err(CodecError::Deserialization(_))
        ));
    }
}
