use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use splice_types::{ClassId, NodeId};

use crate::node::SchemaNode;

/// One RPC operation definition.
///
/// Input and output are implicit containers; a context-routed operation
/// additionally names the input leaf that carries the routing path.
#[derive(Clone, Debug)]
pub struct RpcDef {
    id: NodeId,
    input: Option<Arc<SchemaNode>>,
    output: Option<Arc<SchemaNode>>,
    context_field: Option<String>,
}

impl RpcDef {
    pub(crate) fn new(
        id: NodeId,
        input: Option<Arc<SchemaNode>>,
        output: Option<Arc<SchemaNode>>,
        context_field: Option<String>,
    ) -> Self {
        Self {
            id,
            input,
            output,
            context_field,
        }
    }

    /// The operation's schema path identifier.
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// The implicit input container, if the operation takes input.
    pub fn input(&self) -> Option<&Arc<SchemaNode>> {
        self.input.as_ref()
    }

    /// The implicit output container, if the operation produces output.
    pub fn output(&self) -> Option<&Arc<SchemaNode>> {
        self.output.as_ref()
    }

    /// The input leaf carrying the routing path, for context-routed
    /// operations.
    pub fn context_field(&self) -> Option<&str> {
        self.context_field.as_deref()
    }

    /// Returns `true` for context-routed operations.
    pub fn is_routed(&self) -> bool {
        self.context_field.is_some()
    }
}

/// One notification definition: schema path plus typed class and body shape.
#[derive(Clone, Debug)]
pub struct NotificationDef {
    id: NodeId,
    class: ClassId,
    body: Arc<SchemaNode>,
}

impl NotificationDef {
    pub(crate) fn new(id: NodeId, class: ClassId, body: Arc<SchemaNode>) -> Self {
        Self { id, class, body }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn class(&self) -> &ClassId {
        &self.class
    }

    /// The notification body shape.
    pub fn body(&self) -> &Arc<SchemaNode> {
        &self.body
    }
}

/// One immutable schema generation.
///
/// Snapshots are replaced wholesale on schema updates; every lookup a caller
/// performs against one snapshot is internally consistent.
#[derive(Clone, Debug)]
pub struct SchemaSnapshot {
    generation: u64,
    root: Arc<SchemaNode>,
    rpcs: BTreeMap<NodeId, RpcDef>,
    notifications: BTreeMap<NodeId, NotificationDef>,
    classes: BTreeSet<ClassId>,
}

impl SchemaSnapshot {
    pub(crate) fn new(
        generation: u64,
        root: Arc<SchemaNode>,
        rpcs: BTreeMap<NodeId, RpcDef>,
        notifications: BTreeMap<NodeId, NotificationDef>,
    ) -> Self {
        let mut classes = BTreeSet::new();
        collect_classes(&root, &mut classes);
        for rpc in rpcs.values() {
            for container in [rpc.input(), rpc.output()].into_iter().flatten() {
                collect_classes(container, &mut classes);
            }
        }
        for def in notifications.values() {
            classes.insert(def.class().clone());
            collect_classes(def.body(), &mut classes);
        }
        Self {
            generation,
            root,
            rpcs,
            notifications,
            classes,
        }
    }

    /// Monotonically increasing generation counter.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The synthetic data root.
    pub fn root(&self) -> &Arc<SchemaNode> {
        &self.root
    }

    /// RPC definition by schema path identifier.
    pub fn rpc(&self, id: &NodeId) -> Option<&RpcDef> {
        self.rpcs.get(id)
    }

    /// All RPC definitions.
    pub fn rpcs(&self) -> impl Iterator<Item = &RpcDef> {
        self.rpcs.values()
    }

    /// Notification definition by schema path identifier.
    pub fn notification(&self, id: &NodeId) -> Option<&NotificationDef> {
        self.notifications.get(id)
    }

    /// Notification definition by typed class.
    pub fn notification_for_class(&self, class: &ClassId) -> Option<&NotificationDef> {
        self.notifications.values().find(|d| d.class() == class)
    }

    /// All notification definitions.
    pub fn notifications(&self) -> impl Iterator<Item = &NotificationDef> {
        self.notifications.values()
    }

    /// Returns `true` if any node, RPC or notification of this generation
    /// carries the class. Drives the codec's bounded schema wait.
    pub fn knows_class(&self, class: &ClassId) -> bool {
        self.classes.contains(class)
    }
}

fn collect_classes(node: &SchemaNode, out: &mut BTreeSet<ClassId>) {
    if let Some(class) = node.class() {
        out.insert(class.clone());
    }
    for child in node.children().values() {
        collect_classes(child, out);
    }
    for aug in node.augmentations() {
        out.insert(aug.class().clone());
        for child in aug.children().values() {
            collect_classes(child, out);
        }
    }
}
