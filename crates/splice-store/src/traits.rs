use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use splice_candidate::Candidate;
use splice_types::{GenericNode, GenericPath, NodeId};

use crate::error::{RpcResult, StoreError, StoreResult};

/// Read access to one isolated view of the tree.
#[async_trait]
pub trait GenericReadTransaction: Send + Sync {
    /// Read the subtree at a path, or `None` if nothing is there.
    async fn read(&self, path: &GenericPath) -> StoreResult<Option<GenericNode>>;

    /// Existence check without materializing the subtree.
    async fn exists(&self, path: &GenericPath) -> StoreResult<bool> {
        Ok(self.read(path).await?.is_some())
    }
}

/// Write access: operations stage synchronously, commit applies them
/// atomically.
///
/// The store never creates missing ancestors; a put below an absent parent
/// fails the commit with [`StoreError::MissingParent`].
#[async_trait]
pub trait GenericWriteTransaction: Send + Sync {
    /// Stage a replacement write of the subtree at `path`.
    fn put(&mut self, path: &GenericPath, node: GenericNode);

    /// Stage a deep merge into the subtree at `path`.
    fn merge(&mut self, path: &GenericPath, node: GenericNode);

    /// Stage a delete of the subtree at `path`. Deleting an absent node is
    /// a no-op.
    fn delete(&mut self, path: &GenericPath);

    /// Best-effort cancellation. Returns `false` once the transaction has
    /// been submitted.
    fn cancel(&mut self) -> bool;

    /// Apply all staged operations atomically.
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Combined read/write access against one isolated view, not two objects.
#[async_trait]
pub trait GenericReadWriteTransaction:
    GenericReadTransaction + GenericWriteTransaction
{
}

/// Sequential transaction allocation with chain semantics: at most one
/// outstanding un-submitted write transaction, later transactions observe
/// all earlier submitted writes, and the first commit failure fails the
/// whole chain.
pub trait GenericTransactionChain: Send + Sync {
    fn new_read_transaction(&self) -> StoreResult<Box<dyn GenericReadTransaction>>;
    fn new_write_transaction(&self) -> StoreResult<Box<dyn GenericWriteTransaction>>;
    fn new_read_write_transaction(&self) -> StoreResult<Box<dyn GenericReadWriteTransaction>>;

    /// Graceful close: the success callback fires once the last outstanding
    /// transaction completes.
    fn close(&self);
}

/// Chain lifecycle callbacks; each fires at most once.
pub trait ChainListener: Send + Sync {
    /// First commit failure of the chain.
    fn on_transaction_failed(&self, error: &StoreError);

    /// Graceful close with every transaction committed.
    fn on_chain_successful(&self);
}

/// Subtree change notifications, delivered synchronously on the committing
/// thread, in commit order.
pub trait GenericTreeChangeListener: Send + Sync {
    fn on_changes(&self, changes: &[Candidate]);
}

/// Factory for transactions, chains and change-listener registrations.
pub trait GenericDataStore: Send + Sync {
    fn new_read_transaction(&self) -> Box<dyn GenericReadTransaction>;
    fn new_write_transaction(&self) -> Box<dyn GenericWriteTransaction>;
    fn new_read_write_transaction(&self) -> Box<dyn GenericReadWriteTransaction>;

    fn create_chain(&self, listener: Arc<dyn ChainListener>) -> Box<dyn GenericTransactionChain>;

    fn register_change_listener(
        &self,
        subtree: GenericPath,
        listener: Arc<dyn GenericTreeChangeListener>,
    ) -> ListenerRegistration;
}

/// Handle to an active registration; dropped registrations stay active
/// until closed.
pub struct ListenerRegistration {
    unregister: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerRegistration {
    pub fn new(unregister: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unregister: Some(Box::new(unregister)),
        }
    }

    /// Remove the registration.
    pub fn close(mut self) {
        if let Some(unregister) = self.unregister.take() {
            unregister();
        }
    }
}

/// A payload that encodes on first generic access.
///
/// `as_any` lets in-process consumers recover the original typed value
/// without paying for an encode/decode round trip.
pub trait LazyPayload: Send + Sync {
    fn encode(&self) -> StoreResult<GenericNode>;
    fn as_any(&self) -> &dyn Any;
}

/// Body of a notification or RPC message: pre-encoded or lazy.
#[derive(Clone)]
pub enum Payload {
    Encoded(GenericNode),
    Lazy(Arc<dyn LazyPayload>),
}

impl Payload {
    pub fn lazy(payload: Arc<dyn LazyPayload>) -> Self {
        Payload::Lazy(payload)
    }

    /// The generic body, encoding the lazy form if necessary.
    pub fn node(&self) -> StoreResult<GenericNode> {
        match self {
            Payload::Encoded(node) => Ok(node.clone()),
            Payload::Lazy(payload) => payload.encode(),
        }
    }

    /// The lazy wrapper, when this payload carries one.
    pub fn lazy_ref(&self) -> Option<&Arc<dyn LazyPayload>> {
        match self {
            Payload::Lazy(payload) => Some(payload),
            Payload::Encoded(_) => None,
        }
    }
}

impl From<GenericNode> for Payload {
    fn from(node: GenericNode) -> Self {
        Payload::Encoded(node)
    }
}

/// A notification addressed by its schema path.
pub struct GenericNotification {
    pub path: NodeId,
    pub payload: Payload,
}

impl GenericNotification {
    pub fn encoded(path: NodeId, node: GenericNode) -> Self {
        Self {
            path,
            payload: Payload::Encoded(node),
        }
    }

    pub fn lazy(path: NodeId, payload: Arc<dyn LazyPayload>) -> Self {
        Self {
            path,
            payload: Payload::Lazy(payload),
        }
    }

    /// The generic body, encoding the lazy payload if necessary.
    pub fn node(&self) -> StoreResult<GenericNode> {
        self.payload.node()
    }
}

pub trait NotificationListener: Send + Sync {
    fn on_notification(&self, notification: &GenericNotification);
}

/// Schema-path-keyed notification fan-out.
pub trait NotificationBus: Send + Sync {
    fn publish(&self, notification: GenericNotification) -> StoreResult<()>;

    fn register_listener(
        &self,
        paths: Vec<NodeId>,
        listener: Arc<dyn NotificationListener>,
    ) -> ListenerRegistration;
}

/// One RPC invocation: the input payload plus an optional pre-encoded
/// routing path.
pub struct RpcRequest {
    pub payload: Payload,
    pub route: Option<GenericPath>,
}

impl RpcRequest {
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
            route: None,
        }
    }

    pub fn routed(payload: impl Into<Payload>, route: GenericPath) -> Self {
        Self {
            payload: payload.into(),
            route: Some(route),
        }
    }
}

#[async_trait]
pub trait RpcHandler: Send + Sync {
    async fn invoke(&self, request: RpcRequest) -> RpcResult<Option<Payload>>;
}

/// Schema-path-keyed RPC dispatch.
///
/// Dispatch prefers the handler registered for the request's exact route
/// and falls back to the global (route-less) handler.
#[async_trait]
pub trait RpcBus: Send + Sync {
    fn register(
        &self,
        path: NodeId,
        route: Option<GenericPath>,
        handler: Arc<dyn RpcHandler>,
    ) -> ListenerRegistration;

    async fn invoke(&self, path: &NodeId, request: RpcRequest) -> RpcResult<Option<Payload>>;
}
