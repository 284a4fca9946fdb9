use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;
use crate::ident::NodeId;
use crate::path::{GenericPath, GenericStep};
use crate::scalar::Scalar;

/// A node of the generic, schema-described tree.
///
/// Every node is identified by the [`GenericStep`] that addresses it within
/// its parent. Containers, choices, augmentations and list entries carry
/// child nodes keyed by step; lists carry their entries in order; leaves and
/// leaf-lists carry scalar data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenericNode {
    Container {
        id: NodeId,
        children: BTreeMap<GenericStep, GenericNode>,
    },
    Choice {
        id: NodeId,
        children: BTreeMap<GenericStep, GenericNode>,
    },
    Augmentation {
        ids: BTreeSet<NodeId>,
        children: BTreeMap<GenericStep, GenericNode>,
    },
    List {
        id: NodeId,
        entries: Vec<GenericNode>,
    },
    ListEntry {
        id: NodeId,
        keys: BTreeMap<String, Scalar>,
        children: BTreeMap<GenericStep, GenericNode>,
    },
    Leaf {
        id: NodeId,
        value: Scalar,
    },
    LeafList {
        id: NodeId,
        values: Vec<Scalar>,
    },
    AnyData {
        id: NodeId,
        body: Value,
    },
}

impl GenericNode {
    /// An empty container.
    pub fn container(id: NodeId) -> Self {
        GenericNode::Container {
            id,
            children: BTreeMap::new(),
        }
    }

    /// An empty choice layer.
    pub fn choice(id: NodeId) -> Self {
        GenericNode::Choice {
            id,
            children: BTreeMap::new(),
        }
    }

    /// An empty augmentation layer.
    pub fn augmentation(ids: impl IntoIterator<Item = NodeId>) -> Self {
        GenericNode::Augmentation {
            ids: ids.into_iter().collect(),
            children: BTreeMap::new(),
        }
    }

    /// An empty list.
    pub fn list(id: NodeId) -> Self {
        GenericNode::List {
            id,
            entries: Vec::new(),
        }
    }

    /// A list entry with its key leaves already materialized as children.
    pub fn list_entry(id: NodeId, keys: impl IntoIterator<Item = (String, Scalar)>) -> Self {
        let keys: BTreeMap<String, Scalar> = keys.into_iter().collect();
        let mut children = BTreeMap::new();
        for (name, value) in &keys {
            let leaf_id = id.sibling(name.clone());
            children.insert(
                GenericStep::Node(leaf_id.clone()),
                GenericNode::Leaf {
                    id: leaf_id,
                    value: value.clone(),
                },
            );
        }
        GenericNode::ListEntry { id, keys, children }
    }

    /// A leaf node.
    pub fn leaf(id: NodeId, value: impl Into<Scalar>) -> Self {
        GenericNode::Leaf {
            id,
            value: value.into(),
        }
    }

    /// A leaf-list node.
    pub fn leaf_list(id: NodeId, values: impl IntoIterator<Item = Scalar>) -> Self {
        GenericNode::LeafList {
            id,
            values: values.into_iter().collect(),
        }
    }

    /// An opaque anydata node.
    pub fn any_data(id: NodeId, body: Value) -> Self {
        GenericNode::AnyData { id, body }
    }

    /// The step addressing this node within its parent.
    pub fn step(&self) -> GenericStep {
        match self {
            GenericNode::Container { id, .. }
            | GenericNode::Choice { id, .. }
            | GenericNode::List { id, .. }
            | GenericNode::Leaf { id, .. }
            | GenericNode::LeafList { id, .. }
            | GenericNode::AnyData { id, .. } => GenericStep::Node(id.clone()),
            GenericNode::ListEntry { id, keys, .. } => GenericStep::ListEntry {
                id: id.clone(),
                keys: keys.clone(),
            },
            GenericNode::Augmentation { ids, .. } => GenericStep::Augmentation(ids.clone()),
        }
    }

    /// The node identifier, if the node has a single one.
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            GenericNode::Container { id, .. }
            | GenericNode::Choice { id, .. }
            | GenericNode::List { id, .. }
            | GenericNode::ListEntry { id, .. }
            | GenericNode::Leaf { id, .. }
            | GenericNode::LeafList { id, .. }
            | GenericNode::AnyData { id, .. } => Some(id),
            GenericNode::Augmentation { .. } => None,
        }
    }

    /// Child map for child-bearing variants.
    pub fn children(&self) -> Option<&BTreeMap<GenericStep, GenericNode>> {
        match self {
            GenericNode::Container { children, .. }
            | GenericNode::Choice { children, .. }
            | GenericNode::Augmentation { children, .. }
            | GenericNode::ListEntry { children, .. } => Some(children),
            _ => None,
        }
    }

    /// Entries of a list node.
    pub fn entries(&self) -> Option<&[GenericNode]> {
        match self {
            GenericNode::List { entries, .. } => Some(entries),
            _ => None,
        }
    }

    /// Resolve one child step.
    pub fn child(&self, step: &GenericStep) -> Option<&GenericNode> {
        match self {
            GenericNode::List { entries, .. } => entries.iter().find(|e| &e.step() == step),
            _ => self.children().and_then(|c| c.get(step)),
        }
    }

    fn child_mut(&mut self, step: &GenericStep) -> Option<&mut GenericNode> {
        match self {
            GenericNode::List { entries, .. } => entries.iter_mut().find(|e| &e.step() == step),
            GenericNode::Container { children, .. }
            | GenericNode::Choice { children, .. }
            | GenericNode::Augmentation { children, .. }
            | GenericNode::ListEntry { children, .. } => children.get_mut(step),
            _ => None,
        }
    }

    /// Resolve a relative path below this node.
    pub fn find(&self, steps: &[GenericStep]) -> Option<&GenericNode> {
        let mut current = self;
        for step in steps {
            current = current.child(step)?;
        }
        Some(current)
    }

    /// Resolve a relative path below this node, mutably.
    pub fn find_mut(&mut self, steps: &[GenericStep]) -> Option<&mut GenericNode> {
        let mut current = self;
        for step in steps {
            current = current.child_mut(step)?;
        }
        Some(current)
    }

    /// Resolve an absolute path, treating this node as the tree root.
    pub fn find_path(&self, path: &GenericPath) -> Option<&GenericNode> {
        self.find(path.steps())
    }

    /// Insert or replace a child; the key is the child's own step.
    pub fn set_child(&mut self, child: GenericNode) -> Result<(), TypeError> {
        let step = child.step();
        match self {
            GenericNode::List { id, entries } => {
                match &child {
                    GenericNode::ListEntry { id: entry_id, .. } if entry_id == id => {}
                    _ => {
                        return Err(TypeError::NodeMismatch {
                            expected: format!("entry of list {id}"),
                            actual: step.to_string(),
                        })
                    }
                }
                if let Some(existing) = entries.iter_mut().find(|e| e.step() == step) {
                    *existing = child;
                } else {
                    entries.push(child);
                }
                Ok(())
            }
            GenericNode::Container { children, .. }
            | GenericNode::Choice { children, .. }
            | GenericNode::Augmentation { children, .. }
            | GenericNode::ListEntry { children, .. } => {
                children.insert(step, child);
                Ok(())
            }
            other => Err(TypeError::NotAChildBearer(
                other.node_id().cloned().unwrap_or_else(|| NodeId::new("", "")),
            )),
        }
    }

    /// Remove a child by step, returning it if present.
    pub fn remove_child(&mut self, step: &GenericStep) -> Option<GenericNode> {
        match self {
            GenericNode::List { entries, .. } => {
                let idx = entries.iter().position(|e| &e.step() == step)?;
                Some(entries.remove(idx))
            }
            GenericNode::Container { children, .. }
            | GenericNode::Choice { children, .. }
            | GenericNode::Augmentation { children, .. }
            | GenericNode::ListEntry { children, .. } => children.remove(step),
            _ => None,
        }
    }

    /// Deep-merge `other` into this node.
    ///
    /// Both nodes must address the same step. Scalar data is replaced,
    /// child-bearing variants merge recursively, leaf-list values are
    /// unioned preserving existing order.
    pub fn merge_from(&mut self, other: GenericNode) -> Result<(), TypeError> {
        if self.step() != other.step() {
            return Err(TypeError::NodeMismatch {
                expected: self.step().to_string(),
                actual: other.step().to_string(),
            });
        }
        match (self, other) {
            (GenericNode::Leaf { value, .. }, GenericNode::Leaf { value: v, .. }) => {
                *value = v;
                Ok(())
            }
            (GenericNode::AnyData { body, .. }, GenericNode::AnyData { body: b, .. }) => {
                *body = b;
                Ok(())
            }
            (GenericNode::LeafList { values, .. }, GenericNode::LeafList { values: vs, .. }) => {
                for v in vs {
                    if !values.contains(&v) {
                        values.push(v);
                    }
                }
                Ok(())
            }
            (GenericNode::List { entries, .. }, GenericNode::List { entries: incoming, .. }) => {
                for entry in incoming {
                    let step = entry.step();
                    match entries.iter_mut().find(|e| e.step() == step) {
                        Some(existing) => existing.merge_from(entry)?,
                        None => entries.push(entry),
                    }
                }
                Ok(())
            }
            (this, other) => {
                // Equal steps do not imply equal variants: a leaf and a
                // container with the same id share a step. Only the
                // map-children variants may meet here.
                if this.children().is_none() {
                    return Err(TypeError::NodeMismatch {
                        expected: this.step().to_string(),
                        actual: "child-bearing node".to_string(),
                    });
                }
                let incoming = match other {
                    GenericNode::Container { children, .. }
                    | GenericNode::Choice { children, .. }
                    | GenericNode::Augmentation { children, .. }
                    | GenericNode::ListEntry { children, .. } => children,
                    other => {
                        return Err(TypeError::NodeMismatch {
                            expected: "child-bearing node".to_string(),
                            actual: other.step().to_string(),
                        })
                    }
                };
                for child in incoming.into_values() {
                    match this.child_mut(&child.step()) {
                        Some(existing) => existing.merge_from(child)?,
                        None => this.set_child(child)?,
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nid(name: &str) -> NodeId {
        NodeId::new("net", name)
    }

    fn sample_tree() -> GenericNode {
        let mut nodes = GenericNode::container(nid("nodes"));
        let mut list = GenericNode::list(nid("node"));
        let mut entry =
            GenericNode::list_entry(nid("node"), [("name".to_string(), Scalar::from("n1"))]);
        entry
            .set_child(GenericNode::leaf(nid("mtu"), Scalar::Int(1500)))
            .unwrap();
        list.set_child(entry).unwrap();
        nodes.set_child(list).unwrap();
        nodes
    }

    #[test]
    fn list_entry_materializes_key_leaves() {
        let entry =
            GenericNode::list_entry(nid("node"), [("name".to_string(), Scalar::from("n1"))]);
        let key_leaf = entry.child(&GenericStep::Node(nid("name"))).unwrap();
        assert_eq!(key_leaf, &GenericNode::leaf(nid("name"), "n1"));
    }

    #[test]
    fn find_walks_list_entries() {
        let tree = sample_tree();
        let steps = [
            GenericStep::Node(nid("node")),
            GenericStep::list_entry(nid("node"), [("name".to_string(), Scalar::from("n1"))]),
            GenericStep::Node(nid("mtu")),
        ];
        let mtu = tree.find(&steps).unwrap();
        assert_eq!(mtu, &GenericNode::leaf(nid("mtu"), Scalar::Int(1500)));
    }

    #[test]
    fn find_misses_unknown_entry() {
        let tree = sample_tree();
        let steps = [
            GenericStep::Node(nid("node")),
            GenericStep::list_entry(nid("node"), [("name".to_string(), Scalar::from("n2"))]),
        ];
        assert!(tree.find(&steps).is_none());
    }

    #[test]
    fn set_child_replaces_matching_list_entry() {
        let mut list = GenericNode::list(nid("node"));
        let entry =
            GenericNode::list_entry(nid("node"), [("name".to_string(), Scalar::from("n1"))]);
        list.set_child(entry.clone()).unwrap();
        list.set_child(entry).unwrap();
        assert_eq!(list.entries().unwrap().len(), 1);
    }

    #[test]
    fn set_child_rejects_foreign_list_entry() {
        let mut list = GenericNode::list(nid("node"));
        let foreign =
            GenericNode::list_entry(nid("link"), [("id".to_string(), Scalar::from("l1"))]);
        assert!(list.set_child(foreign).is_err());
    }

    #[test]
    fn leaf_rejects_children() {
        let mut leaf = GenericNode::leaf(nid("mtu"), Scalar::Int(1500));
        assert!(leaf
            .set_child(GenericNode::leaf(nid("x"), Scalar::Empty))
            .is_err());
    }

    #[test]
    fn remove_child_from_list() {
        let mut tree = sample_tree();
        let list = tree
            .find_mut(&[GenericStep::Node(nid("node"))])
            .unwrap();
        let step =
            GenericStep::list_entry(nid("node"), [("name".to_string(), Scalar::from("n1"))]);
        assert!(list.remove_child(&step).is_some());
        assert!(list.remove_child(&step).is_none());
    }

    #[test]
    fn merge_replaces_leaf_and_keeps_siblings() {
        let mut tree = sample_tree();
        let mut incoming = GenericNode::container(nid("nodes"));
        let mut list = GenericNode::list(nid("node"));
        let mut entry =
            GenericNode::list_entry(nid("node"), [("name".to_string(), Scalar::from("n1"))]);
        entry
            .set_child(GenericNode::leaf(nid("mtu"), Scalar::Int(9000)))
            .unwrap();
        list.set_child(entry).unwrap();
        incoming.set_child(list).unwrap();

        tree.merge_from(incoming).unwrap();

        let steps = [
            GenericStep::Node(nid("node")),
            GenericStep::list_entry(nid("node"), [("name".to_string(), Scalar::from("n1"))]),
        ];
        let entry = tree.find(&steps).unwrap();
        assert_eq!(
            entry.child(&GenericStep::Node(nid("mtu"))).unwrap(),
            &GenericNode::leaf(nid("mtu"), Scalar::Int(9000))
        );
        // Key leaf untouched by the merge.
        assert_eq!(
            entry.child(&GenericStep::Node(nid("name"))).unwrap(),
            &GenericNode::leaf(nid("name"), "n1")
        );
    }

    #[test]
    fn merge_rejects_step_mismatch() {
        let mut a = GenericNode::container(nid("a"));
        let b = GenericNode::container(nid("b"));
        assert!(a.merge_from(b).is_err());
    }

    #[test]
    fn merge_unions_leaf_list_values() {
        let mut a = GenericNode::leaf_list(nid("tags"), [Scalar::from("x")]);
        let b = GenericNode::leaf_list(nid("tags"), [Scalar::from("x"), Scalar::from("y")]);
        a.merge_from(b).unwrap();
        assert_eq!(
            a,
            GenericNode::leaf_list(nid("tags"), [Scalar::from("x"), Scalar::from("y")])
        );
    }
}
