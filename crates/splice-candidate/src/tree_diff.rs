//! Structural diff of two generic tree versions.
//!
//! Compares children by step, detecting writes, deletes and modified
//! subtrees. Structural nodes that exist only because of their children
//! (lists, choices, augmentation layers) appear and disappear instead of
//! being written and deleted.

use std::collections::BTreeMap;

use splice_types::{GenericNode, GenericStep};

use crate::node::{CandidateNode, ChangeKind};

/// Compare two versions of a subtree rooted at the same step.
///
/// Returns a candidate node whose kind is [`ChangeKind::Unmodified`] when
/// the versions are equal. If the versions address different steps the
/// whole subtree is treated as a replacement write.
pub fn diff(before: &GenericNode, after: &GenericNode) -> CandidateNode {
    if before.step() != after.step() {
        return CandidateNode::new(
            after.step(),
            ChangeKind::Write,
            Some(before.clone()),
            Some(after.clone()),
            appeared_children(after),
        );
    }
    diff_present(before, after)
}

fn diff_present(before: &GenericNode, after: &GenericNode) -> CandidateNode {
    let step = after.step();
    if before == after {
        return CandidateNode::new(
            step,
            ChangeKind::Unmodified,
            Some(before.clone()),
            Some(after.clone()),
            Vec::new(),
        );
    }
    let kind = if same_shape(before, after) {
        match after {
            GenericNode::Leaf { .. }
            | GenericNode::LeafList { .. }
            | GenericNode::AnyData { .. } => ChangeKind::Write,
            _ => ChangeKind::SubtreeModified,
        }
    } else {
        // A leaf replaced by a container (or any other shape change) is a
        // wholesale write of the new subtree.
        ChangeKind::Write
    };
    let children = diff_children(child_map(before), child_map(after));
    CandidateNode::new(step, kind, Some(before.clone()), Some(after.clone()), children)
}

/// Describe a subtree that did not exist before.
pub(crate) fn node_appeared(after: &GenericNode) -> CandidateNode {
    let kind = if is_structural(after) {
        ChangeKind::Appeared
    } else {
        ChangeKind::Write
    };
    CandidateNode::new(
        after.step(),
        kind,
        None,
        Some(after.clone()),
        appeared_children(after),
    )
}

/// Describe a subtree that no longer exists.
pub(crate) fn node_disappeared(before: &GenericNode) -> CandidateNode {
    let kind = if is_structural(before) {
        ChangeKind::Disappeared
    } else {
        ChangeKind::Delete
    };
    let children = child_map(before)
        .into_values()
        .map(node_disappeared)
        .collect();
    CandidateNode::new(before.step(), kind, Some(before.clone()), None, children)
}

fn appeared_children(after: &GenericNode) -> Vec<CandidateNode> {
    child_map(after).into_values().map(node_appeared).collect()
}

fn diff_children(
    before: BTreeMap<GenericStep, &GenericNode>,
    after: BTreeMap<GenericStep, &GenericNode>,
) -> Vec<CandidateNode> {
    let mut changes = Vec::new();
    for (step, old) in &before {
        match after.get(step) {
            Some(new) => {
                let child = diff_present(old, new);
                if child.is_modified() {
                    changes.push(child);
                }
            }
            None => changes.push(node_disappeared(old)),
        }
    }
    for (step, new) in &after {
        if !before.contains_key(step) {
            changes.push(node_appeared(new));
        }
    }
    changes
}

/// Children of any variant keyed by step; list entries are children of the
/// list node.
fn child_map(node: &GenericNode) -> BTreeMap<GenericStep, &GenericNode> {
    match node {
        GenericNode::List { entries, .. } => {
            entries.iter().map(|e| (e.step(), e)).collect()
        }
        _ => node
            .children()
            .map(|c| c.iter().map(|(s, n)| (s.clone(), n)).collect())
            .unwrap_or_default(),
    }
}

/// Structural nodes exist only through their children.
fn is_structural(node: &GenericNode) -> bool {
    matches!(
        node,
        GenericNode::List { .. } | GenericNode::Choice { .. } | GenericNode::Augmentation { .. }
    )
}

fn same_shape(a: &GenericNode, b: &GenericNode) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}
