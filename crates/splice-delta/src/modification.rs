//! The lazy typed view over one candidate node.
//!
//! Construction is O(1) and touches no children; decoding and kind
//! resolution happen on first access and memoize per instance.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use splice_candidate::{CandidateNode, ChangeKind};
use splice_codec::decode_object;
use splice_schema::{
    Addressability, AugmentationSchema, ClassTarget, NodeKind, SchemaNode, SchemaSnapshot,
    StructuralKind,
};
use splice_types::{
    ClassId, GenericStep, ListKey, NodeId, TypedObject, TypedPath, TypedStep,
};

use crate::error::{DeltaError, DeltaResult};

/// The typed kind of a modification, with structural raw kinds collapsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModificationKind {
    Write,
    Delete,
    SubtreeModified,
}

/// Schema context a candidate node resolves in.
#[derive(Clone, Copy)]
pub(crate) enum Scope<'a> {
    Node(&'a SchemaNode),
    Augmentation(&'a AugmentationSchema),
    /// No schema counterpart in the current generation.
    Unknown,
}

impl<'a> Scope<'a> {
    fn classify(self, step: &GenericStep) -> StructuralKind {
        match self {
            Scope::Node(node) => node.classify_child(step),
            Scope::Augmentation(aug) => match step {
                GenericStep::Node(id) => aug
                    .child(id)
                    .map_or(StructuralKind::Unknown, |c| c.structural_kind()),
                GenericStep::ListEntry { id, .. } => match aug.child(id) {
                    Some(child) => match child.kind() {
                        NodeKind::List { keys } if !keys.is_empty() && child.class().is_some() => {
                            StructuralKind::VisibleContainer
                        }
                        NodeKind::List { .. } => StructuralKind::NotAddressable,
                        _ => StructuralKind::Unknown,
                    },
                    None => StructuralKind::Unknown,
                },
                GenericStep::LeafListEntry { .. } => StructuralKind::NotAddressable,
                GenericStep::Augmentation(_) => StructuralKind::Unknown,
            },
            Scope::Unknown => StructuralKind::Unknown,
        }
    }

    fn addressability(self) -> Addressability {
        match self {
            Scope::Node(node) => node.addressability(),
            Scope::Augmentation(aug) => aug.addressability(),
            Scope::Unknown => Addressability::Unaddressable,
        }
    }

    pub(crate) fn find_class(self, class: &ClassId) -> Option<ClassTarget<'a>> {
        match self {
            Scope::Node(node) => node.find_class(class),
            Scope::Augmentation(aug) => aug.find_class(class),
            Scope::Unknown => None,
        }
    }

    fn child_node(self, id: &NodeId) -> Option<&'a SchemaNode> {
        match self {
            Scope::Node(node) => node.child(id).map(AsRef::as_ref),
            Scope::Augmentation(aug) => aug.child(id).map(AsRef::as_ref),
            Scope::Unknown => None,
        }
    }

    fn augmentation_matching(self, ids: &BTreeSet<NodeId>) -> Option<&'a AugmentationSchema> {
        match self {
            Scope::Node(node) => node
                .augmentations()
                .iter()
                .find(|a| a.step() == GenericStep::Augmentation(ids.clone())),
            _ => None,
        }
    }
}

/// One node of the typed change view.
pub struct TypedModification<'a> {
    snapshot: &'a SchemaSnapshot,
    scope: Scope<'a>,
    path: TypedPath,
    node: &'a CandidateNode,
    kind: OnceLock<DeltaResult<ModificationKind>>,
    before: OnceLock<DeltaResult<Option<TypedObject>>>,
    after: OnceLock<DeltaResult<Option<TypedObject>>>,
}

impl<'a> TypedModification<'a> {
    pub(crate) fn new(
        snapshot: &'a SchemaSnapshot,
        scope: Scope<'a>,
        path: TypedPath,
        node: &'a CandidateNode,
    ) -> Self {
        Self {
            snapshot,
            scope,
            path,
            node,
            kind: OnceLock::new(),
            before: OnceLock::new(),
            after: OnceLock::new(),
        }
    }

    /// The typed path of this modification.
    pub fn path(&self) -> &TypedPath {
        &self.path
    }

    /// The underlying candidate node.
    pub fn candidate(&self) -> &'a CandidateNode {
        self.node
    }

    /// The collapsed typed kind, computed once.
    pub fn modification_kind(&self) -> DeltaResult<ModificationKind> {
        self.kind.get_or_init(|| self.compute_kind()).clone()
    }

    fn compute_kind(&self) -> DeltaResult<ModificationKind> {
        match self.node.kind() {
            ChangeKind::Write | ChangeKind::Appeared => Ok(ModificationKind::Write),
            ChangeKind::Delete | ChangeKind::Disappeared => Ok(ModificationKind::Delete),
            ChangeKind::SubtreeModified => Ok(match self.scope.addressability() {
                Addressability::Addressable => ModificationKind::SubtreeModified,
                Addressability::Unaddressable => ModificationKind::Write,
                // A caller can only observe a changed not-addressable
                // descendant through a write of this node.
                Addressability::Mixed => {
                    if has_hidden_change(self.scope, self.node) {
                        ModificationKind::Write
                    } else {
                        ModificationKind::SubtreeModified
                    }
                }
            }),
            ChangeKind::Unmodified => Err(DeltaError::UnsupportedModification(format!(
                "unmodified node at {}",
                self.node.step()
            ))),
        }
    }

    /// The decoded value before the change, memoized.
    pub fn data_before(&self) -> DeltaResult<Option<TypedObject>> {
        self.before
            .get_or_init(|| self.decode(self.node.before()))
            .clone()
    }

    /// The decoded value after the change, memoized.
    pub fn data_after(&self) -> DeltaResult<Option<TypedObject>> {
        self.after
            .get_or_init(|| self.decode(self.node.after()))
            .clone()
    }

    fn decode(
        &self,
        data: Option<&splice_types::GenericNode>,
    ) -> DeltaResult<Option<TypedObject>> {
        match data {
            Some(node) => decode_object(self.snapshot, &self.path, node)
                .map(Some)
                .map_err(|e| DeltaError::Decode(e.to_string())),
            None => Ok(None),
        }
    }

    /// Modified children with typed counterparts, in schema order.
    ///
    /// Not-addressable children are dropped; invisible choice/case and
    /// whole-list layers are flattened so their grandchildren appear
    /// directly in this set.
    pub fn modified_children(&self) -> Vec<TypedModification<'a>> {
        let mut out = Vec::new();
        self.collect_modified(self.scope, self.node, &mut out);
        out
    }

    fn collect_modified(
        &self,
        scope: Scope<'a>,
        parent: &'a CandidateNode,
        out: &mut Vec<TypedModification<'a>>,
    ) {
        for child in parent.children() {
            if !child.is_modified() {
                continue;
            }
            match scope.classify(child.step()) {
                StructuralKind::NotAddressable => {}
                StructuralKind::InvisibleContainer => {
                    let inner = match child.step() {
                        GenericStep::Node(id) => scope.child_node(id),
                        _ => None,
                    };
                    if let Some(inner) = inner {
                        self.collect_modified(Scope::Node(inner), child, out);
                    }
                }
                // Entries carry the list's identifier, so they keep
                // resolving against the enclosing scope.
                StructuralKind::InvisibleList => self.collect_modified(scope, child, out),
                StructuralKind::VisibleContainer | StructuralKind::Unknown => {
                    out.push(self.child_modification(scope, child));
                }
            }
        }
    }

    fn child_modification(
        &self,
        scope: Scope<'a>,
        child: &'a CandidateNode,
    ) -> TypedModification<'a> {
        let (child_scope, path) = match child.step() {
            GenericStep::Node(id) => match scope.child_node(id) {
                Some(node) => (Scope::Node(node), self.extend_item(node.class())),
                None => (Scope::Unknown, self.path.clone()),
            },
            GenericStep::ListEntry { id, keys } => match scope.child_node(id) {
                Some(list) => {
                    let path = match list.class() {
                        Some(class) => self.path.clone().entry(
                            class.clone(),
                            keys.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                        ),
                        None => self.path.clone(),
                    };
                    (Scope::Node(list), path)
                }
                None => (Scope::Unknown, self.path.clone()),
            },
            GenericStep::Augmentation(ids) => match scope.augmentation_matching(ids) {
                Some(aug) => (
                    Scope::Augmentation(aug),
                    self.path.clone().child(aug.class().clone()),
                ),
                None => (Scope::Unknown, self.path.clone()),
            },
            GenericStep::LeafListEntry { .. } => (Scope::Unknown, self.path.clone()),
        };
        TypedModification::new(self.snapshot, child_scope, path, child)
    }

    fn extend_item(&self, class: Option<&ClassId>) -> TypedPath {
        match class {
            Some(class) => self.path.clone().child(class.clone()),
            None => self.path.clone(),
        }
    }

    /// Navigate to the modification a typed step addresses.
    ///
    /// Total for resolution: an absent or unmodified target yields
    /// `Ok(None)`. A step whose shape does not fit the schema is a caller
    /// bug and fails with [`DeltaError::InvalidStep`].
    pub fn modified_child(&self, step: &TypedStep) -> DeltaResult<Option<TypedModification<'a>>> {
        match step {
            TypedStep::Wildcard(class) => Err(DeltaError::InvalidStep(format!(
                "wildcard step {class} cannot address a modification"
            ))),
            TypedStep::Item(class) => match self.scope.find_class(class) {
                Some(ClassTarget::Node { prefix, node }) => {
                    if matches!(node.kind(), NodeKind::List { .. }) {
                        return Err(DeltaError::InvalidStep(format!(
                            "class {class} is a list; address an entry"
                        )));
                    }
                    Ok(self.walk(&prefix).map(|cand| {
                        TypedModification::new(
                            self.snapshot,
                            Scope::Node(node.as_ref()),
                            self.path.clone().child(class.clone()),
                            cand,
                        )
                    }))
                }
                Some(ClassTarget::Augmentation(aug)) => {
                    Ok(self.walk(&[aug.step()]).map(|cand| {
                        TypedModification::new(
                            self.snapshot,
                            Scope::Augmentation(aug),
                            self.path.clone().child(class.clone()),
                            cand,
                        )
                    }))
                }
                None => Ok(None),
            },
            TypedStep::Entry { class, key } => match self.scope.find_class(class) {
                Some(ClassTarget::Node { mut prefix, node }) => {
                    match node.kind() {
                        NodeKind::List { keys } if !keys.is_empty() => {}
                        _ => {
                            return Err(DeltaError::InvalidStep(format!(
                                "class {class} is not a keyed list"
                            )))
                        }
                    }
                    prefix.push(GenericStep::list_entry(
                        node.id().clone(),
                        key.iter().map(|(k, v)| (k.clone(), v.clone())),
                    ));
                    Ok(self.walk(&prefix).map(|cand| {
                        TypedModification::new(
                            self.snapshot,
                            Scope::Node(node.as_ref()),
                            self.path.clone().entry(class.clone(), key.clone()),
                            cand,
                        )
                    }))
                }
                Some(ClassTarget::Augmentation(_)) => Err(DeltaError::InvalidStep(format!(
                    "class {class} is an augmentation, not a list"
                ))),
                None => Ok(None),
            },
        }
    }

    /// Navigate to a container or augmentation child.
    pub fn modified_child_item(
        &self,
        class: impl Into<ClassId>,
    ) -> DeltaResult<Option<TypedModification<'a>>> {
        self.modified_child(&TypedStep::Item(class.into()))
    }

    /// Navigate to one keyed list entry.
    pub fn modified_child_entry(
        &self,
        class: impl Into<ClassId>,
        key: ListKey,
    ) -> DeltaResult<Option<TypedModification<'a>>> {
        self.modified_child(&TypedStep::Entry {
            class: class.into(),
            key,
        })
    }

    fn walk(&self, steps: &[GenericStep]) -> Option<&'a CandidateNode> {
        let mut current = self.node;
        for step in steps {
            current = current.child(step)?;
        }
        current.is_modified().then_some(current)
    }
}

/// Whether any changed descendant is invisible to typed callers.
fn has_hidden_change(scope: Scope<'_>, parent: &CandidateNode) -> bool {
    parent.children().iter().any(|child| {
        if !child.is_modified() {
            return false;
        }
        match scope.classify(child.step()) {
            StructuralKind::NotAddressable => true,
            StructuralKind::InvisibleContainer => {
                let inner = match child.step() {
                    GenericStep::Node(id) => scope.child_node(id),
                    _ => None,
                };
                match inner {
                    Some(inner) => has_hidden_change(Scope::Node(inner), child),
                    None => false,
                }
            }
            StructuralKind::InvisibleList => has_hidden_change(scope, child),
            StructuralKind::VisibleContainer | StructuralKind::Unknown => false,
        }
    })
}
