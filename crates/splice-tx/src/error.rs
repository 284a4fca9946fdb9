use splice_codec::CodecError;
use splice_store::StoreError;
use thiserror::Error;

/// Errors produced by typed reads.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The path cannot be read directly (wildcards, unknown classes).
    #[error("invalid read path: {0}")]
    InvalidPath(String),

    /// The stored subtree does not decode into the requested shape.
    #[error(transparent)]
    Codec(CodecError),

    /// The store failed the read. The conflict/unavailable distinction of
    /// the underlying error is preserved for retry decisions.
    #[error("read failed: {0}")]
    Store(#[from] StoreError),
}

impl ReadError {
    pub(crate) fn from_codec(error: CodecError) -> Self {
        match error {
            CodecError::InvalidPath(reason) => ReadError::InvalidPath(reason),
            other => ReadError::Codec(other),
        }
    }
}

pub type ReadResult<T> = Result<T, ReadError>;

/// Errors produced by typed commit.
#[derive(Debug, Error)]
pub enum CommitError {
    /// Another transaction won the optimistic lock; retrying against fresh
    /// state may succeed.
    #[error("commit conflict: {0}")]
    Conflict(String),

    /// The store cannot serve commits; retrying will not help.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other store-side commit failure.
    #[error("commit failed: {0}")]
    Store(StoreError),
}

impl From<StoreError> for CommitError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict(reason) => CommitError::Conflict(reason),
            StoreError::Unavailable(reason) => CommitError::Unavailable(reason),
            other => CommitError::Store(other),
        }
    }
}

pub type CommitResult<T> = Result<T, CommitError>;

/// Errors produced by typed transaction chains.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The chain already has an outstanding un-submitted transaction.
    #[error("chain has an outstanding transaction")]
    ChainBusy,

    /// A previous transaction of the chain failed; the chain is unusable.
    #[error("chain already failed")]
    ChainFailed,

    /// The chain was closed; no further transactions can be allocated.
    #[error("chain already closed")]
    ChainClosed,

    /// Any other store-side allocation failure.
    #[error("chain allocation failed: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ChainError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::ChainBusy => ChainError::ChainBusy,
            StoreError::ChainFailed => ChainError::ChainFailed,
            other => ChainError::Store(other),
        }
    }
}

pub type ChainResult<T> = Result<T, ChainError>;
