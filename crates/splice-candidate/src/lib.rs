//! Change candidates for Splice.
//!
//! A candidate describes what one commit did to a generic tree: a tree of
//! per-node change descriptors carrying the change kind plus the data before
//! and after. Candidates are produced by the data store on commit and
//! consumed by change listeners and the typed delta layer.
//!
//! # Key Types
//!
//! - [`ChangeKind`] -- what happened to one node
//! - [`CandidateNode`] -- one node's change, with changed children
//! - [`Candidate`] -- a rooted candidate tree
//! - [`diff`] -- compare two versions of a subtree

pub mod node;
pub mod tree_diff;

pub use node::{Candidate, CandidateNode, ChangeKind};
pub use tree_diff::diff;
