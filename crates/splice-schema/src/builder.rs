//! Fluent construction of schema snapshots.
//!
//! The real system receives snapshots from the schema compiler; the builder
//! exists for tests and embedders. Nodes without an explicit `.class(..)`
//! have no typed counterpart, which is how non-addressable shapes are
//! modelled.

use std::collections::BTreeMap;
use std::sync::Arc;

use splice_types::{ClassId, NodeId};

use crate::node::{summarize_children, AugmentationSchema, NodeKind, SchemaNode};
use crate::snapshot::{NotificationDef, RpcDef, SchemaSnapshot};

/// Builder for one schema node and its subtree.
pub struct NodeBuilder {
    id: NodeId,
    kind: NodeKind,
    class: Option<ClassId>,
    children: Vec<NodeBuilder>,
    augments: Vec<(ClassId, Vec<NodeBuilder>)>,
}

impl NodeBuilder {
    fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            class: None,
            children: Vec::new(),
            augments: Vec::new(),
        }
    }

    fn child_id(&self, name: &str) -> NodeId {
        self.id.sibling(name)
    }

    /// Bind a typed class to this node.
    pub fn class(mut self, class: impl Into<ClassId>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Add a leaf child.
    pub fn leaf(mut self, name: &str) -> Self {
        self.children
            .push(NodeBuilder::new(self.child_id(name), NodeKind::Leaf));
        self
    }

    /// Add a leaf-list child.
    pub fn leaf_list(mut self, name: &str) -> Self {
        self.children
            .push(NodeBuilder::new(self.child_id(name), NodeKind::LeafList));
        self
    }

    /// Add an anydata child.
    pub fn any_data(mut self, name: &str) -> Self {
        self.children
            .push(NodeBuilder::new(self.child_id(name), NodeKind::AnyData));
        self
    }

    /// Add a container child.
    pub fn container(mut self, name: &str, f: impl FnOnce(NodeBuilder) -> NodeBuilder) -> Self {
        let child = f(NodeBuilder::new(self.child_id(name), NodeKind::Container));
        self.children.push(child);
        self
    }

    /// Add a list child; an empty `keys` slice makes it keyless.
    pub fn list(
        mut self,
        name: &str,
        keys: &[&str],
        f: impl FnOnce(NodeBuilder) -> NodeBuilder,
    ) -> Self {
        let kind = NodeKind::List {
            keys: keys.iter().map(|k| k.to_string()).collect(),
        };
        let child = f(NodeBuilder::new(self.child_id(name), kind));
        self.children.push(child);
        self
    }

    /// Add a choice child; `f` receives a builder accepting `.case(..)`.
    pub fn choice(mut self, name: &str, f: impl FnOnce(ChoiceBuilder) -> ChoiceBuilder) -> Self {
        let choice = f(ChoiceBuilder {
            node: NodeBuilder::new(self.child_id(name), NodeKind::Choice),
        });
        self.children.push(choice.node);
        self
    }

    /// Attach an augmentation introducing the children built by `f`.
    pub fn augment(
        mut self,
        class: impl Into<ClassId>,
        f: impl FnOnce(NodeBuilder) -> NodeBuilder,
    ) -> Self {
        // A scratch container collects the augmentation's children.
        let scratch = f(NodeBuilder::new(self.id.clone(), NodeKind::Container));
        self.augments.push((class.into(), scratch.children));
        self
    }

    fn build(self) -> Arc<SchemaNode> {
        let children: BTreeMap<NodeId, Arc<SchemaNode>> = self
            .children
            .into_iter()
            .map(|c| {
                let built = c.build();
                (built.id().clone(), built)
            })
            .collect();

        let augmentations: Vec<AugmentationSchema> = self
            .augments
            .into_iter()
            .map(|(class, children)| {
                let children: BTreeMap<NodeId, Arc<SchemaNode>> = children
                    .into_iter()
                    .map(|c| {
                        let built = c.build();
                        (built.id().clone(), built)
                    })
                    .collect();
                let addressability = summarize_children(children.values(), false);
                AugmentationSchema::new(class, children, addressability)
            })
            .collect();

        let addressability = summarize_children(children.values(), !augmentations.is_empty());

        Arc::new(SchemaNode::new(
            self.id,
            self.class,
            self.kind,
            children,
            augmentations,
            addressability,
        ))
    }
}

/// Builder for the cases of a choice.
pub struct ChoiceBuilder {
    node: NodeBuilder,
}

impl ChoiceBuilder {
    /// Add a case holding the children built by `f`.
    pub fn case(mut self, name: &str, f: impl FnOnce(NodeBuilder) -> NodeBuilder) -> Self {
        let case = f(NodeBuilder::new(self.node.child_id(name), NodeKind::Case));
        self.node.children.push(case);
        self
    }
}

/// Builder for an RPC operation.
pub struct RpcBuilder {
    id: NodeId,
    input: Option<NodeBuilder>,
    output: Option<NodeBuilder>,
    context_field: Option<String>,
}

impl RpcBuilder {
    /// Define the implicit input container.
    pub fn input(mut self, f: impl FnOnce(NodeBuilder) -> NodeBuilder) -> Self {
        self.input = Some(f(NodeBuilder::new(
            self.id.sibling("input"),
            NodeKind::Container,
        )));
        self
    }

    /// Define the implicit output container.
    pub fn output(mut self, f: impl FnOnce(NodeBuilder) -> NodeBuilder) -> Self {
        self.output = Some(f(NodeBuilder::new(
            self.id.sibling("output"),
            NodeKind::Container,
        )));
        self
    }

    /// Mark the operation context-routed, naming the input leaf that
    /// carries the routing path.
    pub fn routed(mut self, context_field: &str) -> Self {
        self.context_field = Some(context_field.to_string());
        self
    }
}

/// Builder for one schema snapshot.
pub struct SchemaBuilder {
    module: String,
    generation: u64,
    root: NodeBuilder,
    rpcs: BTreeMap<NodeId, RpcDef>,
    notifications: BTreeMap<NodeId, NotificationDef>,
}

impl SchemaBuilder {
    /// Start a snapshot for the given module and generation.
    pub fn new(module: &str, generation: u64) -> Self {
        Self {
            module: module.to_string(),
            generation,
            root: NodeBuilder::new(NodeId::new(module, "data-root"), NodeKind::Container),
            rpcs: BTreeMap::new(),
            notifications: BTreeMap::new(),
        }
    }

    /// Add a top-level container.
    pub fn container(mut self, name: &str, f: impl FnOnce(NodeBuilder) -> NodeBuilder) -> Self {
        self.root = self.root.container(name, f);
        self
    }

    /// Add a top-level list.
    pub fn list(
        mut self,
        name: &str,
        keys: &[&str],
        f: impl FnOnce(NodeBuilder) -> NodeBuilder,
    ) -> Self {
        self.root = self.root.list(name, keys, f);
        self
    }

    /// Declare an RPC operation.
    pub fn rpc(mut self, name: &str, f: impl FnOnce(RpcBuilder) -> RpcBuilder) -> Self {
        let id = NodeId::new(self.module.clone(), name);
        let built = f(RpcBuilder {
            id: id.clone(),
            input: None,
            output: None,
            context_field: None,
        });
        let def = RpcDef::new(
            id.clone(),
            built.input.map(NodeBuilder::build),
            built.output.map(NodeBuilder::build),
            built.context_field,
        );
        self.rpcs.insert(id, def);
        self
    }

    /// Declare a notification with a typed class and a body shape.
    pub fn notification(
        mut self,
        name: &str,
        class: impl Into<ClassId>,
        f: impl FnOnce(NodeBuilder) -> NodeBuilder,
    ) -> Self {
        let id = NodeId::new(self.module.clone(), name);
        let class = class.into();
        let body = f(NodeBuilder::new(id.clone(), NodeKind::Container).class(class.clone()));
        self.notifications
            .insert(id.clone(), NotificationDef::new(id, class, body.build()));
        self
    }

    /// Build the immutable snapshot.
    pub fn build(self) -> Arc<SchemaSnapshot> {
        Arc::new(SchemaSnapshot::new(
            self.generation,
            self.root.build(),
            self.rpcs,
            self.notifications,
        ))
    }
}
