//! Schema model for Splice.
//!
//! The schema service (an external collaborator) compiles data models into
//! immutable [`SchemaSnapshot`] generations and pushes them into a
//! [`SchemaTracker`]. Everything the binding layer knows about node shapes,
//! typed classes, addressability and RPC/notification definitions comes from
//! the current snapshot; no operation ever observes a mix of two
//! generations.
//!
//! # Key Types
//!
//! - [`SchemaNode`] / [`NodeKind`] -- one schema node and its shape
//! - [`StructuralKind`] / [`Addressability`] -- how a node maps onto the
//!   typed address space, and the per-node child summary
//! - [`SchemaSnapshot`] -- one immutable schema generation
//! - [`SchemaBuilder`] -- fluent construction, used by tests and embedders
//! - [`SchemaTracker`] -- atomic snapshot swap plus bounded predicate waits

pub mod builder;
pub mod error;
pub mod node;
pub mod snapshot;
pub mod tracker;

pub use builder::SchemaBuilder;
pub use error::{SchemaError, SchemaResult};
pub use node::{
    Addressability, AugmentationSchema, ClassTarget, NodeKind, SchemaNode, StructuralKind,
};
pub use snapshot::{NotificationDef, RpcDef, SchemaSnapshot};
pub use tracker::SchemaTracker;
