//! Typed read transactions.

use splice_codec::BindingCodec;
use splice_store::GenericReadTransaction;
use splice_types::{DataObject, TypedObject, TypedPath};

use crate::error::{ReadError, ReadResult};
use crate::id::TransactionId;

/// Read the subtree at a typed path through a generic delegate.
///
/// Wildcarded paths are rejected before the store is touched; a wildcard
/// scopes listeners, it never addresses data.
pub(crate) async fn read_object_via<D>(
    codec: &BindingCodec,
    delegate: &D,
    path: &TypedPath,
) -> ReadResult<Option<TypedObject>>
where
    D: GenericReadTransaction + ?Sized,
{
    let generic = encode_read_path(codec, path)?;
    match delegate.read(&generic).await? {
        Some(node) => codec
            .decode_object(path, &node)
            .map(Some)
            .map_err(ReadError::Codec),
        None => Ok(None),
    }
}

pub(crate) async fn exists_via<D>(
    codec: &BindingCodec,
    delegate: &D,
    path: &TypedPath,
) -> ReadResult<bool>
where
    D: GenericReadTransaction + ?Sized,
{
    let generic = encode_read_path(codec, path)?;
    Ok(delegate.exists(&generic).await?)
}

fn encode_read_path(
    codec: &BindingCodec,
    path: &TypedPath,
) -> ReadResult<splice_types::GenericPath> {
    if path.is_wildcarded() {
        return Err(ReadError::InvalidPath(format!(
            "wildcarded path {path} cannot be read directly"
        )));
    }
    codec.encode_path(path).map_err(ReadError::from_codec)
}

/// A read-only view of the tree, isolated at creation time.
pub struct TypedReadTransaction {
    id: TransactionId,
    codec: BindingCodec,
    delegate: Box<dyn GenericReadTransaction>,
}

impl TypedReadTransaction {
    pub fn new(codec: BindingCodec, delegate: Box<dyn GenericReadTransaction>) -> Self {
        Self {
            id: TransactionId::allocate(),
            codec,
            delegate,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Read and decode the value at a typed path.
    pub async fn read<T: DataObject>(&self, path: &TypedPath) -> ReadResult<Option<T>> {
        match self.read_object(path).await? {
            Some(object) => object
                .to_data::<T>()
                .map(Some)
                .map_err(|e| ReadError::Codec(splice_codec::CodecError::Deserialization(
                    e.to_string(),
                ))),
            None => Ok(None),
        }
    }

    /// Read without committing to a concrete struct.
    pub async fn read_object(&self, path: &TypedPath) -> ReadResult<Option<TypedObject>> {
        read_object_via(&self.codec, self.delegate.as_ref(), path).await
    }

    pub async fn exists(&self, path: &TypedPath) -> ReadResult<bool> {
        exists_via(&self.codec, self.delegate.as_ref(), path).await
    }
}
