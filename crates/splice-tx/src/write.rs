//! Typed write and read-write transactions.

use std::sync::Arc;

use tracing::debug;

use splice_codec::{BindingCodec, CodecError, CodecResult};
use splice_store::{GenericReadWriteTransaction, GenericWriteTransaction};
use splice_types::{DataObject, TypedObject, TypedPath};

use crate::chain::ChainShared;
use crate::error::{CommitResult, ReadResult};
use crate::id::TransactionId;
use crate::read::{exists_via, read_object_via};

/// Whether a write synthesizes default-empty ancestors before the real
/// operation. The store itself never creates missing parents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateParents {
    Yes,
    No,
}

pub(crate) fn stage_put<D>(
    codec: &BindingCodec,
    delegate: &mut D,
    path: &TypedPath,
    object: &TypedObject,
    parents: CreateParents,
) -> CodecResult<()>
where
    D: GenericWriteTransaction + ?Sized,
{
    stage_ancestors(codec, delegate, path, parents)?;
    let (generic, node) = codec.encode_object(path, object)?;
    delegate.put(&generic, node);
    Ok(())
}

pub(crate) fn stage_merge<D>(
    codec: &BindingCodec,
    delegate: &mut D,
    path: &TypedPath,
    object: &TypedObject,
    parents: CreateParents,
) -> CodecResult<()>
where
    D: GenericWriteTransaction + ?Sized,
{
    stage_ancestors(codec, delegate, path, parents)?;
    let (generic, node) = codec.encode_object(path, object)?;
    delegate.merge(&generic, node);
    Ok(())
}

pub(crate) fn stage_delete<D>(
    codec: &BindingCodec,
    delegate: &mut D,
    path: &TypedPath,
) -> CodecResult<()>
where
    D: GenericWriteTransaction + ?Sized,
{
    // A wildcard scopes listeners, it never addresses data; encoding one
    // would resolve to the whole list and delete every entry.
    if path.is_wildcarded() {
        return Err(CodecError::InvalidPath(format!(
            "wildcarded path {path} cannot be deleted"
        )));
    }
    let generic = codec.encode_path(path)?;
    delegate.delete(&generic);
    Ok(())
}

/// Merge every ancestor's default-empty node, root to leaf, so the real
/// operation never lands under a missing parent.
fn stage_ancestors<D>(
    codec: &BindingCodec,
    delegate: &mut D,
    path: &TypedPath,
    parents: CreateParents,
) -> CodecResult<()>
where
    D: GenericWriteTransaction + ?Sized,
{
    if parents == CreateParents::Yes {
        for (generic, shell) in codec.default_ancestors(path)? {
            delegate.merge(&generic, shell);
        }
    }
    Ok(())
}

fn capture<T: DataObject>(value: &T) -> CodecResult<TypedObject> {
    TypedObject::from_data(value).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// A write-only transaction: operations stage eagerly-encoded generic data,
/// `submit` applies them atomically.
pub struct TypedWriteTransaction {
    id: TransactionId,
    codec: BindingCodec,
    delegate: Box<dyn GenericWriteTransaction>,
    chain: Option<Arc<ChainShared>>,
}

impl TypedWriteTransaction {
    pub fn new(codec: BindingCodec, delegate: Box<dyn GenericWriteTransaction>) -> Self {
        Self {
            id: TransactionId::allocate(),
            codec,
            delegate,
            chain: None,
        }
    }

    pub(crate) fn chained(
        codec: BindingCodec,
        delegate: Box<dyn GenericWriteTransaction>,
        chain: Arc<ChainShared>,
    ) -> Self {
        Self {
            id: TransactionId::allocate(),
            codec,
            delegate,
            chain: Some(chain),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Stage a replacement write of the value at a typed path.
    pub fn put<T: DataObject>(
        &mut self,
        path: &TypedPath,
        value: &T,
        parents: CreateParents,
    ) -> CodecResult<()> {
        let object = capture(value)?;
        stage_put(&self.codec, self.delegate.as_mut(), path, &object, parents)
    }

    /// Stage a deep merge of the value at a typed path.
    pub fn merge<T: DataObject>(
        &mut self,
        path: &TypedPath,
        value: &T,
        parents: CreateParents,
    ) -> CodecResult<()> {
        let object = capture(value)?;
        stage_merge(&self.codec, self.delegate.as_mut(), path, &object, parents)
    }

    /// Stage a delete of the subtree at a typed path.
    pub fn delete(&mut self, path: &TypedPath) -> CodecResult<()> {
        stage_delete(&self.codec, self.delegate.as_mut(), path)
    }

    /// Best-effort cancellation. Returns `false` once submitted.
    pub fn cancel(&mut self) -> bool {
        self.delegate.cancel()
    }

    /// Apply all staged operations atomically. Commit failures are never
    /// auto-retried by this layer.
    pub async fn submit(self) -> CommitResult<()> {
        submit_via(self.id, self.delegate, self.chain).await
    }
}

pub(crate) async fn submit_via<D>(
    id: TransactionId,
    delegate: Box<D>,
    chain: Option<Arc<ChainShared>>,
) -> CommitResult<()>
where
    D: GenericWriteTransaction + ?Sized,
{
    if let Some(chain) = &chain {
        chain.begin_submit(id);
    }
    let result = delegate.commit().await;
    if let Some(chain) = &chain {
        chain.end_submit();
    }
    if let Err(error) = &result {
        debug!(%id, %error, "commit failed");
    }
    result.map_err(Into::into)
}

/// Reads and writes against one isolated view; reads observe the
/// transaction's own staged writes.
pub struct TypedReadWriteTransaction {
    id: TransactionId,
    codec: BindingCodec,
    delegate: Box<dyn GenericReadWriteTransaction>,
    chain: Option<Arc<ChainShared>>,
}

impl TypedReadWriteTransaction {
    pub fn new(codec: BindingCodec, delegate: Box<dyn GenericReadWriteTransaction>) -> Self {
        Self {
            id: TransactionId::allocate(),
            codec,
            delegate,
            chain: None,
        }
    }

    pub(crate) fn chained(
        codec: BindingCodec,
        delegate: Box<dyn GenericReadWriteTransaction>,
        chain: Arc<ChainShared>,
    ) -> Self {
        Self {
            id: TransactionId::allocate(),
            codec,
            delegate,
            chain: Some(chain),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub async fn read<T: DataObject>(&self, path: &TypedPath) -> ReadResult<Option<T>> {
        match self.read_object(path).await? {
            Some(object) => object.to_data::<T>().map(Some).map_err(|e| {
                crate::error::ReadError::Codec(CodecError::Deserialization(e.to_string()))
            }),
            None => Ok(None),
        }
    }

    pub async fn read_object(&self, path: &TypedPath) -> ReadResult<Option<TypedObject>> {
        read_object_via(&self.codec, self.delegate.as_ref(), path).await
    }

    pub async fn exists(&self, path: &TypedPath) -> ReadResult<bool> {
        exists_via(&self.codec, self.delegate.as_ref(), path).await
    }

    pub fn put<T: DataObject>(
        &mut self,
        path: &TypedPath,
        value: &T,
        parents: CreateParents,
    ) -> CodecResult<()> {
        let object = capture(value)?;
        stage_put(&self.codec, self.delegate.as_mut(), path, &object, parents)
    }

    pub fn merge<T: DataObject>(
        &mut self,
        path: &TypedPath,
        value: &T,
        parents: CreateParents,
    ) -> CodecResult<()> {
        let object = capture(value)?;
        stage_merge(&self.codec, self.delegate.as_mut(), path, &object, parents)
    }

    pub fn delete(&mut self, path: &TypedPath) -> CodecResult<()> {
        stage_delete(&self.codec, self.delegate.as_mut(), path)
    }

    pub fn cancel(&mut self) -> bool {
        self.delegate.cancel()
    }

    pub async fn submit(self) -> CommitResult<()> {
        submit_via(self.id, self.delegate, self.chain).await
    }
}
