use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ident::NodeId;
use crate::scalar::Scalar;

/// One hop of a [`GenericPath`].
///
/// The generic address space is richer than the typed one: choice, case and
/// augmentation layers appear here even though they are invisible to typed
/// callers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GenericStep {
    /// A plain node: container, leaf, leaf-list, choice, anydata, or a whole
    /// list.
    Node(NodeId),
    /// One entry of a keyed list, selected by its key leaf values.
    ListEntry {
        id: NodeId,
        keys: BTreeMap<String, Scalar>,
    },
    /// One entry of a leaf-list, selected by value.
    LeafListEntry { id: NodeId, value: Scalar },
    /// An augmentation layer, identified by the set of child names it
    /// introduces.
    Augmentation(BTreeSet<NodeId>),
}

impl GenericStep {
    /// Entry step for a keyed list.
    pub fn list_entry(id: NodeId, keys: impl IntoIterator<Item = (String, Scalar)>) -> Self {
        GenericStep::ListEntry {
            id,
            keys: keys.into_iter().collect(),
        }
    }

    /// The node identifier this step addresses, if it has a single one.
    ///
    /// Augmentation steps are identified by a set of child names and return
    /// `None`.
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            GenericStep::Node(id) => Some(id),
            GenericStep::ListEntry { id, .. } => Some(id),
            GenericStep::LeafListEntry { id, .. } => Some(id),
            GenericStep::Augmentation(_) => None,
        }
    }

    /// Returns `true` for augmentation steps.
    pub fn is_augmentation(&self) -> bool {
        matches!(self, GenericStep::Augmentation(_))
    }
}

impl fmt::Display for GenericStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenericStep::Node(id) => write!(f, "{id}"),
            GenericStep::ListEntry { id, keys } => {
                write!(f, "{id}[")?;
                for (i, (k, v)) in keys.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                f.write_str("]")
            }
            GenericStep::LeafListEntry { id, value } => write!(f, "{id}[.={value}]"),
            GenericStep::Augmentation(ids) => {
                f.write_str("aug{")?;
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{id}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Address of a node in the generic tree: an ordered sequence of steps from
/// the (unnamed) root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GenericPath(Vec<GenericStep>);

impl GenericPath {
    /// The empty path addressing the tree root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from steps.
    pub fn new(steps: impl IntoIterator<Item = GenericStep>) -> Self {
        Self(steps.into_iter().collect())
    }

    /// Extend this path by one step.
    pub fn child(mut self, step: GenericStep) -> Self {
        self.0.push(step);
        self
    }

    /// Append a step in place.
    pub fn push(&mut self, step: GenericStep) {
        self.0.push(step);
    }

    /// The steps of this path, root first.
    pub fn steps(&self) -> &[GenericStep] {
        &self.0
    }

    /// The final step, or `None` for the root path.
    pub fn last(&self) -> Option<&GenericStep> {
        self.0.last()
    }

    /// The path without its final step, or `None` for the root path.
    pub fn parent(&self) -> Option<GenericPath> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Returns `true` if `self` addresses `other` or a descendant of it.
    pub fn starts_with(&self, other: &GenericPath) -> bool {
        self.0.len() >= other.0.len() && self.0[..other.0.len()] == other.0[..]
    }

    /// The steps of `self` below `prefix`, or `None` if `self` is not under
    /// `prefix`.
    pub fn strip_prefix(&self, prefix: &GenericPath) -> Option<&[GenericStep]> {
        if self.starts_with(prefix) {
            Some(&self.0[prefix.0.len()..])
        } else {
            None
        }
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the root path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GenericPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for step in &self.0 {
            write!(f, "/{step}")?;
        }
        Ok(())
    }
}

impl FromIterator<GenericStep> for GenericPath {
    fn from_iter<I: IntoIterator<Item = GenericStep>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nid(name: &str) -> NodeId {
        NodeId::new("net", name)
    }

    #[test]
    fn parent_and_last() {
        let path = GenericPath::root()
            .child(GenericStep::Node(nid("nodes")))
            .child(GenericStep::list_entry(
                nid("node"),
                [("name".to_string(), Scalar::from("n1"))],
            ));
        assert_eq!(path.len(), 2);
        assert!(matches!(path.last(), Some(GenericStep::ListEntry { .. })));

        let parent = path.parent().unwrap();
        assert_eq!(parent.len(), 1);
        assert!(parent.parent().unwrap().is_empty());
        assert!(GenericPath::root().parent().is_none());
    }

    #[test]
    fn starts_with_and_strip_prefix() {
        let base = GenericPath::root().child(GenericStep::Node(nid("nodes")));
        let deeper = base.clone().child(GenericStep::Node(nid("node")));

        assert!(deeper.starts_with(&base));
        assert!(!base.starts_with(&deeper));
        assert!(deeper.starts_with(&GenericPath::root()));

        let rest = deeper.strip_prefix(&base).unwrap();
        assert_eq!(rest, &[GenericStep::Node(nid("node"))]);
        assert!(base.strip_prefix(&deeper).is_none());
    }

    #[test]
    fn display_forms() {
        let path = GenericPath::root()
            .child(GenericStep::Node(nid("nodes")))
            .child(GenericStep::list_entry(
                nid("node"),
                [("name".to_string(), Scalar::from("n1"))],
            ));
        assert_eq!(path.to_string(), "/net:nodes/net:node[name=n1]");
        assert_eq!(GenericPath::root().to_string(), "/");
    }

    #[test]
    fn serde_roundtrip() {
        let path = GenericPath::root()
            .child(GenericStep::Node(nid("nodes")))
            .child(GenericStep::LeafListEntry {
                id: nid("tag"),
                value: Scalar::from("edge"),
            });
        let json = serde_json::to_value(&path).unwrap();
        let back: GenericPath = serde_json::from_value(json).unwrap();
        assert_eq!(path, back);
    }
}
