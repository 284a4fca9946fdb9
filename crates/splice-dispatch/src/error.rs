use thiserror::Error;

use splice_codec::CodecError;
use splice_store::{RpcError, StoreError};

/// Failures crossing a dispatch adapter.
///
/// Adapters translate between the typed and generic layers, so every
/// failure is one of the underlying layers' failures; this enum just
/// carries them across without flattening the distinction.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
