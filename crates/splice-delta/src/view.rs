//! The per-candidate view handed to typed tree-change listeners.

use std::sync::Arc;

use splice_candidate::Candidate;
use splice_schema::{ClassTarget, SchemaSnapshot};
use splice_types::TypedPath;

use crate::modification::{Scope, TypedModification};

/// One candidate wrapped for typed consumption.
///
/// Construction is O(1); the root [`TypedModification`] and everything
/// below it materialize lazily on access.
pub struct DataTreeModification {
    snapshot: Arc<SchemaSnapshot>,
    path: TypedPath,
    candidate: Candidate,
}

impl DataTreeModification {
    pub fn new(snapshot: Arc<SchemaSnapshot>, path: TypedPath, candidate: Candidate) -> Self {
        Self {
            snapshot,
            path,
            candidate,
        }
    }

    /// The typed path of the candidate root.
    pub fn path(&self) -> &TypedPath {
        &self.path
    }

    /// The underlying candidate.
    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    /// The root of the typed change view.
    pub fn root(&self) -> TypedModification<'_> {
        let scope = resolve_scope(&self.snapshot, &self.path);
        TypedModification::new(&self.snapshot, scope, self.path.clone(), self.candidate.root())
    }
}

/// Resolve the schema context the path's target lives in. An unresolvable
/// path yields the unknown scope; accessors then degrade gracefully
/// instead of erroring at construction.
fn resolve_scope<'a>(snapshot: &'a SchemaSnapshot, path: &TypedPath) -> Scope<'a> {
    let mut scope = Scope::Node(snapshot.root().as_ref());
    for step in path.steps() {
        scope = match scope.find_class(step.class()) {
            Some(ClassTarget::Node { node, .. }) => Scope::Node(node.as_ref()),
            Some(ClassTarget::Augmentation(aug)) => Scope::Augmentation(aug),
            None => return Scope::Unknown,
        };
    }
    scope
}
