use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use splice_types::{ClassId, GenericStep, NodeId};

/// Shape of a schema node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Container,
    /// A list; `keys` is empty for keyless lists.
    List { keys: Vec<String> },
    Leaf,
    LeafList,
    Choice,
    Case,
    AnyData,
}

/// How a node maps onto the typed-path address space.
///
/// A pure function of the node's kind and the shape of the identifier
/// addressing it; see [`SchemaNode::classify_child`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StructuralKind {
    /// No typed counterpart: leaves, leaf-lists, anydata, keyless list
    /// entries, class-less containers.
    NotAddressable,
    /// A transparent layer: choice or case.
    InvisibleContainer,
    /// A whole-list layer; typed callers see the entries, not the list.
    InvisibleList,
    /// A typed object node: container, keyed list entry, augmentation.
    VisibleContainer,
    /// Not resolvable against the current schema generation.
    Unknown,
}

/// Summary of the addressability of a node's direct children, with
/// transparent layers resolved into their grandchildren.
///
/// Precomputed when a snapshot is built; drives the modification-kind
/// collapse rules of the delta layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Addressability {
    /// Every child change can be reported as a nested typed modification.
    Addressable,
    /// No child change can; any subtree change must widen to a write of
    /// this node.
    Unaddressable,
    /// Some can, some cannot.
    Mixed,
}

/// One augmentation attached to a container-like schema node: a typed class
/// introducing a set of children.
#[derive(Clone, Debug)]
pub struct AugmentationSchema {
    class: ClassId,
    children: BTreeMap<NodeId, Arc<SchemaNode>>,
    addressability: Addressability,
}

impl AugmentationSchema {
    pub(crate) fn new(
        class: ClassId,
        children: BTreeMap<NodeId, Arc<SchemaNode>>,
        addressability: Addressability,
    ) -> Self {
        Self {
            class,
            children,
            addressability,
        }
    }

    /// The augmentation's typed class.
    pub fn class(&self) -> &ClassId {
        &self.class
    }

    /// The children the augmentation introduces.
    pub fn children(&self) -> &BTreeMap<NodeId, Arc<SchemaNode>> {
        &self.children
    }

    /// Child-addressability summary over the introduced children.
    pub fn addressability(&self) -> Addressability {
        self.addressability
    }

    /// The generic step addressing this augmentation layer.
    pub fn step(&self) -> GenericStep {
        GenericStep::Augmentation(self.children.keys().cloned().collect())
    }

    /// Child by identifier.
    pub fn child(&self, id: &NodeId) -> Option<&Arc<SchemaNode>> {
        self.children.get(id)
    }

    /// Child by local name.
    pub fn child_by_name(&self, name: &str) -> Option<&Arc<SchemaNode>> {
        self.children.values().find(|c| c.id().name() == name)
    }

    /// Resolve a typed class among the children this augmentation
    /// introduces, descending through invisible choice/case layers.
    pub fn find_class(&self, class: &ClassId) -> Option<ClassTarget<'_>> {
        find_class_in_children(&self.children, class)
    }
}

/// Resolution of a typed class within one schema context.
#[derive(Debug)]
pub enum ClassTarget<'a> {
    /// A regular node, reached through zero or more invisible layers whose
    /// generic steps are given in `prefix` (the node's own step included
    /// last).
    Node {
        prefix: Vec<GenericStep>,
        node: &'a Arc<SchemaNode>,
    },
    /// An augmentation layer.
    Augmentation(&'a AugmentationSchema),
}

/// One immutable schema node.
#[derive(Clone, Debug)]
pub struct SchemaNode {
    id: NodeId,
    class: Option<ClassId>,
    kind: NodeKind,
    children: BTreeMap<NodeId, Arc<SchemaNode>>,
    augmentations: Vec<AugmentationSchema>,
    addressability: Addressability,
}

impl SchemaNode {
    pub(crate) fn new(
        id: NodeId,
        class: Option<ClassId>,
        kind: NodeKind,
        children: BTreeMap<NodeId, Arc<SchemaNode>>,
        augmentations: Vec<AugmentationSchema>,
        addressability: Addressability,
    ) -> Self {
        Self {
            id,
            class,
            kind,
            children,
            augmentations,
            addressability,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// The typed class bound to this node, if it has a typed counterpart.
    pub fn class(&self) -> Option<&ClassId> {
        self.class.as_ref()
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> &BTreeMap<NodeId, Arc<SchemaNode>> {
        &self.children
    }

    pub fn augmentations(&self) -> &[AugmentationSchema] {
        &self.augmentations
    }

    /// Child-addressability summary for this node.
    pub fn addressability(&self) -> Addressability {
        self.addressability
    }

    /// Key leaf names, for keyed lists.
    pub fn list_keys(&self) -> &[String] {
        match &self.kind {
            NodeKind::List { keys } => keys,
            _ => &[],
        }
    }

    /// Direct child by identifier.
    pub fn child(&self, id: &NodeId) -> Option<&Arc<SchemaNode>> {
        self.children.get(id)
    }

    /// Direct child by local name.
    pub fn child_by_name(&self, name: &str) -> Option<&Arc<SchemaNode>> {
        self.children.values().find(|c| c.id.name() == name)
    }

    /// Augmentation by typed class name.
    pub fn augmentation_by_class(&self, class: &ClassId) -> Option<&AugmentationSchema> {
        self.augmentations.iter().find(|a| &a.class == class)
    }

    /// This node's own structural kind, ignoring identifier shape.
    pub fn structural_kind(&self) -> StructuralKind {
        match &self.kind {
            NodeKind::Leaf | NodeKind::LeafList | NodeKind::AnyData => {
                StructuralKind::NotAddressable
            }
            NodeKind::Choice | NodeKind::Case => StructuralKind::InvisibleContainer,
            NodeKind::List { .. } => StructuralKind::InvisibleList,
            NodeKind::Container => {
                if self.class.is_some() {
                    StructuralKind::VisibleContainer
                } else {
                    StructuralKind::NotAddressable
                }
            }
        }
    }

    /// Classify the child a generic step addresses.
    ///
    /// Pure in (schema node, step shape); total -- unresolvable steps are
    /// [`StructuralKind::Unknown`], never an error.
    pub fn classify_child(&self, step: &GenericStep) -> StructuralKind {
        match step {
            GenericStep::Node(id) => match self.child(id) {
                Some(child) => child.structural_kind(),
                None => StructuralKind::Unknown,
            },
            GenericStep::ListEntry { id, .. } => match self.child(id) {
                Some(child) => match child.kind() {
                    NodeKind::List { keys } if !keys.is_empty() => {
                        if child.class.is_some() {
                            StructuralKind::VisibleContainer
                        } else {
                            StructuralKind::NotAddressable
                        }
                    }
                    NodeKind::List { .. } => StructuralKind::NotAddressable,
                    _ => StructuralKind::Unknown,
                },
                None => StructuralKind::Unknown,
            },
            GenericStep::LeafListEntry { .. } => StructuralKind::NotAddressable,
            GenericStep::Augmentation(ids) => {
                let matches = self
                    .augmentations
                    .iter()
                    .any(|a| a.step() == GenericStep::Augmentation(ids.clone()));
                if matches {
                    StructuralKind::VisibleContainer
                } else {
                    StructuralKind::Unknown
                }
            }
        }
    }

    /// Resolve a typed class among this node's children, descending through
    /// invisible choice/case layers and considering augmentations.
    pub fn find_class(&self, class: &ClassId) -> Option<ClassTarget<'_>> {
        find_class_in_children(&self.children, class).or_else(|| {
            self.augmentations
                .iter()
                .find(|a| &a.class == class)
                .map(ClassTarget::Augmentation)
        })
    }
}

fn find_class_in_children<'a>(
    children: &'a BTreeMap<NodeId, Arc<SchemaNode>>,
    class: &ClassId,
) -> Option<ClassTarget<'a>> {
    // Direct children first.
    for child in children.values() {
        if child.class.as_ref() == Some(class) {
            return Some(ClassTarget::Node {
                prefix: vec![GenericStep::Node(child.id.clone())],
                node: child,
            });
        }
    }
    // Children hidden behind choice/case layers.
    for child in children.values() {
        if !matches!(child.kind, NodeKind::Choice) {
            continue;
        }
        for case in child.children.values() {
            for inner in case.children.values() {
                if inner.class.as_ref() == Some(class) {
                    return Some(ClassTarget::Node {
                        prefix: vec![
                            GenericStep::Node(child.id.clone()),
                            GenericStep::Node(case.id.clone()),
                            GenericStep::Node(inner.id.clone()),
                        ],
                        node: inner,
                    });
                }
            }
        }
    }
    None
}

/// Compute the child-addressability summary over a set of direct children.
///
/// Transparent layers (choice, case) contribute their grandchildren; keyed
/// lists contribute as addressable (their entries are typed objects).
pub(crate) fn summarize_children<'a>(
    children: impl Iterator<Item = &'a Arc<SchemaNode>>,
    has_augmentations: bool,
) -> Addressability {
    let mut any_addressable = has_augmentations;
    let mut any_unaddressable = false;

    fn visit(node: &SchemaNode, addressable: &mut bool, unaddressable: &mut bool) {
        match node.kind() {
            NodeKind::Leaf | NodeKind::LeafList | NodeKind::AnyData => *unaddressable = true,
            NodeKind::Choice | NodeKind::Case => {
                for child in node.children().values() {
                    visit(child, addressable, unaddressable);
                }
            }
            NodeKind::List { keys } => {
                if !keys.is_empty() && node.class().is_some() {
                    *addressable = true;
                } else {
                    *unaddressable = true;
                }
            }
            NodeKind::Container => {
                if node.class().is_some() {
                    *addressable = true;
                } else {
                    *unaddressable = true;
                }
            }
        }
    }

    for child in children {
        visit(child, &mut any_addressable, &mut any_unaddressable);
    }

    match (any_addressable, any_unaddressable) {
        (_, false) => Addressability::Addressable,
        (false, true) => Addressability::Unaddressable,
        (true, true) => Addressability::Mixed,
    }
}
