use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;
use crate::ident::ClassId;
use crate::scalar::Scalar;

/// Trait implemented by application structs that cross the binding boundary.
///
/// There is no generated-class reflection in Rust, so the binding contract is
/// serde plus a [`ClassId`] resolved against the schema: field names follow
/// the schema child names, nested lists are arrays of entry objects, a
/// choice is a field named after the choice holding an object with exactly
/// one field naming the active case, and augmentation children live under a
/// field named after the augmentation class.
pub trait DataObject: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The typed class this struct represents.
    fn binding_class() -> ClassId;
}

/// Key leaf values selecting one entry of a keyed list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListKey(BTreeMap<String, Scalar>);

impl ListKey {
    /// A key with a single leaf.
    pub fn single(name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(name.into(), value.into());
        Self(map)
    }

    /// Value of one key leaf.
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.0.get(name)
    }

    /// Iterate key leaves in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.0.iter()
    }

    /// The underlying map.
    pub fn as_map(&self) -> &BTreeMap<String, Scalar> {
        &self.0
    }
}

impl FromIterator<(String, Scalar)> for ListKey {
    fn from_iter<I: IntoIterator<Item = (String, Scalar)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One hop of a [`TypedPath`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypedStep {
    /// A non-list node: container, case, augmentation, notification.
    Item(ClassId),
    /// One entry of a keyed list.
    Entry { class: ClassId, key: ListKey },
    /// A keyed list without a key: addresses every entry. Wildcarded paths
    /// are legal for listener scopes but illegal for direct reads/writes.
    Wildcard(ClassId),
}

impl TypedStep {
    /// The typed class this step names.
    pub fn class(&self) -> &ClassId {
        match self {
            TypedStep::Item(class) | TypedStep::Wildcard(class) => class,
            TypedStep::Entry { class, .. } => class,
        }
    }

    /// Key of a list-entry step.
    pub fn key(&self) -> Option<&ListKey> {
        match self {
            TypedStep::Entry { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Returns `true` for wildcard steps.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, TypedStep::Wildcard(_))
    }
}

impl fmt::Display for TypedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedStep::Item(class) => write!(f, "{class}"),
            TypedStep::Entry { class, key } => {
                write!(f, "{class}[")?;
                for (i, (k, v)) in key.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                f.write_str("]")
            }
            TypedStep::Wildcard(class) => write!(f, "{class}[*]"),
        }
    }
}

/// Address of a typed object: an ordered sequence of typed steps, each of
/// which resolves to exactly one schema node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypedPath(Vec<TypedStep>);

impl TypedPath {
    /// A single-step path addressing a top-level node.
    pub fn of(class: impl Into<ClassId>) -> Self {
        Self(vec![TypedStep::Item(class.into())])
    }

    /// Build a path from steps.
    pub fn new(steps: impl IntoIterator<Item = TypedStep>) -> Self {
        Self(steps.into_iter().collect())
    }

    /// Extend with a non-list child.
    pub fn child(mut self, class: impl Into<ClassId>) -> Self {
        self.0.push(TypedStep::Item(class.into()));
        self
    }

    /// Extend with a keyed list entry.
    pub fn entry(mut self, class: impl Into<ClassId>, key: ListKey) -> Self {
        self.0.push(TypedStep::Entry {
            class: class.into(),
            key,
        });
        self
    }

    /// Extend with a wildcarded list step.
    pub fn wildcard(mut self, class: impl Into<ClassId>) -> Self {
        self.0.push(TypedStep::Wildcard(class.into()));
        self
    }

    /// The steps of this path, root first.
    pub fn steps(&self) -> &[TypedStep] {
        &self.0
    }

    /// The final step.
    pub fn last(&self) -> Option<&TypedStep> {
        self.0.last()
    }

    /// The class the path targets.
    pub fn target_class(&self) -> Option<&ClassId> {
        self.0.last().map(TypedStep::class)
    }

    /// The path without its final step.
    pub fn parent(&self) -> Option<TypedPath> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Returns `true` if any step is wildcarded.
    pub fn is_wildcarded(&self) -> bool {
        self.0.iter().any(TypedStep::is_wildcard)
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the empty path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TypedPath {
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

impl FromIterator<TypedStep> for TypedPath {
    fn from_iter<I: IntoIterator<Item = TypedStep>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// An immutable typed value: a class plus its schema-shaped JSON data.
///
/// Adapters and dispatch tables move `TypedObject`s so they stay
/// object-safe; concrete [`DataObject`] structs appear only at API edges.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedObject {
    class: ClassId,
    value: Value,
}

impl TypedObject {
    /// Wrap an already-shaped value.
    pub fn new(class: impl Into<ClassId>, value: Value) -> Self {
        Self {
            class: class.into(),
            value,
        }
    }

    /// Capture a typed struct.
    pub fn from_data<T: DataObject>(data: &T) -> Result<Self, TypeError> {
        let value =
            serde_json::to_value(data).map_err(|e| TypeError::Serialization(e.to_string()))?;
        Ok(Self {
            class: T::binding_class(),
            value,
        })
    }

    /// Recover the typed struct. Fails if `T` names a different class or the
    /// data does not fit its shape.
    pub fn to_data<T: DataObject>(&self) -> Result<T, TypeError> {
        let expected = T::binding_class();
        if self.class != expected {
            return Err(TypeError::Serialization(format!(
                "class mismatch: object is {}, requested {}",
                self.class, expected
            )));
        }
        serde_json::from_value(self.value.clone())
            .map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// The typed class.
    pub fn class(&self) -> &ClassId {
        &self.class
    }

    /// The schema-shaped value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// One top-level field of the value, if it is an object.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.value.as_object().and_then(|map| map.get(name))
    }

    /// Consume into the raw value.
    pub fn into_value(self) -> Value {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Node {
        name: String,
        mtu: i64,
    }

    impl DataObject for Node {
        fn binding_class() -> ClassId {
            ClassId::new("Node")
        }
    }

    #[test]
    fn typed_object_roundtrip() {
        let node = Node {
            name: "n1".into(),
            mtu: 1500,
        };
        let obj = TypedObject::from_data(&node).unwrap();
        assert_eq!(obj.class(), &ClassId::new("Node"));
        assert_eq!(obj.field("name"), Some(&Value::String("n1".into())));
        assert_eq!(obj.to_data::<Node>().unwrap(), node);
    }

    #[test]
    fn to_data_rejects_class_mismatch() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Link {
            name: String,
            mtu: i64,
        }
        impl DataObject for Link {
            fn binding_class() -> ClassId {
                ClassId::new("Link")
            }
        }

        let obj = TypedObject::new("Node", serde_json::json!({"name": "n1", "mtu": 1500}));
        assert!(obj.to_data::<Link>().is_err());
    }

    #[test]
    fn wildcard_detection() {
        let direct = TypedPath::of("Nodes").entry("Node", ListKey::single("name", "n1"));
        assert!(!direct.is_wildcarded());

        let scope = TypedPath::of("Nodes").wildcard("Node");
        assert!(scope.is_wildcarded());
        assert_eq!(scope.to_string(), "/Nodes/Node[*]");
    }

    #[test]
    fn display_forms() {
        let path = TypedPath::of("Nodes").entry("Node", ListKey::single("name", "n1"));
        assert_eq!(path.to_string(), "/Nodes/Node[name=n1]");
        assert_eq!(TypedPath::default().to_string(), "/");
    }

    #[test]
    fn parent_drops_last_step() {
        let path = TypedPath::of("Nodes").child("Stats");
        let parent = path.parent().unwrap();
        assert_eq!(parent, TypedPath::of("Nodes"));
    }
}
