//! Typed transactions for Splice.
//!
//! Thin adapters that let callers work with [`DataObject`](splice_types::DataObject)
//! structs and [`TypedPath`](splice_types::TypedPath)s while the generic
//! store underneath only ever sees
//! encoded paths and nodes. Encoding happens eagerly at staging time;
//! `submit` is the only async step.
//!
//! # Key Types
//!
//! - [`TypedReadTransaction`] / [`TypedWriteTransaction`] /
//!   [`TypedReadWriteTransaction`]
//! - [`CreateParents`] -- opt-in ancestor synthesis for writes
//! - [`TypedTransactionChain`] / [`TypedChainListener`]
//! - [`TransactionId`] -- caller-visible transaction identity

pub mod chain;
pub mod error;
pub mod id;
pub mod read;
pub mod write;

pub use chain::{ChainStatus, TypedChainListener, TypedTransactionChain};
pub use error::{
    ChainError, ChainResult, CommitError, CommitResult, ReadError, ReadResult,
};
pub use id::TransactionId;
pub use read::TypedReadTransaction;
pub use write::{CreateParents, TypedReadWriteTransaction, TypedWriteTransaction};
