use splice_types::{GenericPath, NodeId};
use thiserror::Error;

/// Errors produced by the generic store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Another transaction committed first; retrying against fresh state
    /// may succeed.
    #[error("optimistic lock conflict: {0}")]
    Conflict(String),

    /// The store cannot serve the request; retrying will not help.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A write was staged under a parent that does not exist. The store
    /// never creates ancestors on its own.
    #[error("missing parent at {0}")]
    MissingParent(GenericPath),

    /// The staged data does not fit the tree at its path.
    #[error("invalid write: {0}")]
    InvalidWrite(String),

    /// The transaction was cancelled before submit.
    #[error("transaction cancelled")]
    Cancelled,

    /// The chain already has an outstanding un-submitted transaction.
    #[error("chain has an outstanding transaction")]
    ChainBusy,

    /// A previous transaction of the chain failed; the chain is unusable.
    #[error("chain already failed")]
    ChainFailed,

    /// A lazy notification payload could not be encoded.
    #[error("payload encoding failed: {0}")]
    Encoding(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors produced by RPC dispatch.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// No handler is registered for the operation (or its route).
    #[error("no implementation available for {0}")]
    NoImplementation(NodeId),

    /// The handler ran and failed.
    #[error("invocation failed: {0}")]
    Failed(String),
}

pub type RpcResult<T> = Result<T, RpcError>;
