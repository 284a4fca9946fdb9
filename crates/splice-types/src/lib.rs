//! Foundation types for Splice.
//!
//! Splice binds a strongly-typed application view of configuration data to a
//! dynamically-typed, schema-described tree used for storage, transactions and
//! dispatch. This crate provides the vocabulary shared by both sides. Every
//! other Splice crate depends on `splice-types`.
//!
//! # Key Types
//!
//! - [`NodeId`] -- qualified name of a schema/tree node (module + local name)
//! - [`ClassId`] -- name of a generated typed class, resolved against the schema
//! - [`Scalar`] -- leaf value (including pre-encoded instance paths)
//! - [`GenericStep`] / [`GenericPath`] -- address of a node in the generic tree
//! - [`GenericNode`] -- tagged generic tree node
//! - [`TypedStep`] / [`TypedPath`] -- address in the typed object graph
//! - [`TypedObject`] / [`DataObject`] -- immutable typed values and the trait
//!   application structs implement to cross the binding boundary

pub mod error;
pub mod ident;
pub mod node;
pub mod path;
pub mod scalar;
pub mod typed;

pub use error::TypeError;
pub use ident::{ClassId, NodeId};
pub use node::GenericNode;
pub use path::{GenericPath, GenericStep};
pub use scalar::Scalar;
pub use typed::{DataObject, ListKey, TypedObject, TypedPath, TypedStep};
