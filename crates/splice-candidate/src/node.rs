use splice_types::{GenericNode, GenericPath, GenericStep};

/// What happened to one node between two versions of a tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// The node was written: created fresh or replaced wholesale.
    Write,
    /// The node was deleted.
    Delete,
    /// A structural node came into existence because children below it
    /// were written. Lists, choices and augmentation layers appear; data
    /// nodes are written.
    Appeared,
    /// A structural node ceased to exist because its last child was
    /// deleted.
    Disappeared,
    /// The node itself is unchanged but some descendant changed.
    SubtreeModified,
    /// Nothing changed at or below this node.
    Unmodified,
}

/// One node's change between two tree versions.
///
/// Carries the full subtree before and after the change, so consumers can
/// inspect either version without going back to the store. `children`
/// holds only the changed children; unchanged siblings are omitted.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateNode {
    step: GenericStep,
    kind: ChangeKind,
    before: Option<GenericNode>,
    after: Option<GenericNode>,
    children: Vec<CandidateNode>,
}

impl CandidateNode {
    pub(crate) fn new(
        step: GenericStep,
        kind: ChangeKind,
        before: Option<GenericNode>,
        after: Option<GenericNode>,
        children: Vec<CandidateNode>,
    ) -> Self {
        Self {
            step,
            kind,
            before,
            after,
            children,
        }
    }

    /// The step addressing this node within its parent.
    pub fn step(&self) -> &GenericStep {
        &self.step
    }

    /// The change kind.
    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    /// The subtree before the change, if the node existed.
    pub fn before(&self) -> Option<&GenericNode> {
        self.before.as_ref()
    }

    /// The subtree after the change, if the node still exists.
    pub fn after(&self) -> Option<&GenericNode> {
        self.after.as_ref()
    }

    /// The changed children, in step order.
    pub fn children(&self) -> &[CandidateNode] {
        &self.children
    }

    /// Look up a changed child by step.
    pub fn child(&self, step: &GenericStep) -> Option<&CandidateNode> {
        self.children.iter().find(|c| &c.step == step)
    }

    /// Returns `true` if anything changed at or below this node.
    pub fn is_modified(&self) -> bool {
        self.kind != ChangeKind::Unmodified
    }
}

/// A candidate tree rooted at a path within the store.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    root_path: GenericPath,
    root: CandidateNode,
}

impl Candidate {
    /// Wrap a candidate node with the path it is rooted at.
    pub fn new(root_path: GenericPath, root: CandidateNode) -> Self {
        Self { root_path, root }
    }

    /// Where in the store the candidate is rooted.
    pub fn root_path(&self) -> &GenericPath {
        &self.root_path
    }

    /// The root change descriptor.
    pub fn root(&self) -> &CandidateNode {
        &self.root
    }
}
