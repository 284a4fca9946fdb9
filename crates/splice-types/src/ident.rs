use std::fmt;

use serde::{Deserialize, Serialize};

/// Qualified name of a node in the generic tree or the schema.
///
/// A `NodeId` pairs the defining module's name with the node's local name.
/// Two nodes with the same local name in different modules are distinct.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    module: String,
    name: String,
}

impl NodeId {
    /// Create a node identifier from a module name and a local name.
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    /// The defining module's name.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The node's local name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A sibling identifier in the same module.
    pub fn sibling(&self, name: impl Into<String>) -> Self {
        Self::new(self.module.clone(), name)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}:{})", self.module, self.name)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.name)
    }
}

/// Name of a generated typed class.
///
/// Rust carries no runtime reflection over generated bindings, so typed
/// classes are identified by an interned name and resolved against the
/// current schema snapshot. The identifier itself is pure data.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(String);

impl ClassId {
    /// Create a class identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The class name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ClassId {
    fn from(name: String) -> Self {
        Self(name)
    }
}
