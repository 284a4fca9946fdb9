//! The generic delegate bundle and the typed service facades built on it.

use std::sync::Arc;

use splice_codec::BindingCodec;
use splice_dispatch::{
    DispatchResult, RpcProviderAdapter, TypedNotificationListener, TypedNotificationPublisher,
    TypedRpcImplementation, TypedRpcInvoker, TypedTreeChangeListener,
};
use splice_store::{
    GenericDataStore, InMemoryDataStore, InMemoryNotificationBus, InMemoryRpcBus,
    ListenerRegistration, NotificationBus, RpcBus,
};
use splice_tx::{
    TypedChainListener, TypedReadTransaction, TypedReadWriteTransaction, TypedTransactionChain,
    TypedWriteTransaction,
};
use splice_types::{DataObject, NodeId, TypedObject, TypedPath};

/// Every generic delegate the typed facades are built from.
///
/// Cloning shares the delegates; facades constructed from clones observe
/// the same store and buses.
#[derive(Clone)]
pub struct GenericServices {
    codec: BindingCodec,
    store: Arc<dyn GenericDataStore>,
    notifications: Arc<dyn NotificationBus>,
    rpc: Arc<dyn RpcBus>,
}

impl GenericServices {
    pub fn new(
        codec: BindingCodec,
        store: Arc<dyn GenericDataStore>,
        notifications: Arc<dyn NotificationBus>,
        rpc: Arc<dyn RpcBus>,
    ) -> Self {
        Self {
            codec,
            store,
            notifications,
            rpc,
        }
    }

    /// The full in-memory stack behind one codec.
    pub fn in_memory(codec: BindingCodec) -> Self {
        Self::new(
            codec,
            Arc::new(InMemoryDataStore::new()),
            Arc::new(InMemoryNotificationBus::new()),
            Arc::new(InMemoryRpcBus::new()),
        )
    }

    pub fn codec(&self) -> &BindingCodec {
        &self.codec
    }

    pub fn store(&self) -> &Arc<dyn GenericDataStore> {
        &self.store
    }

    pub fn notifications(&self) -> &Arc<dyn NotificationBus> {
        &self.notifications
    }

    pub fn rpc(&self) -> &Arc<dyn RpcBus> {
        &self.rpc
    }
}

/// Typed entry point to the data tree: transactions, chains and
/// tree-change listeners.
pub struct TypedDataBroker {
    services: GenericServices,
}

impl TypedDataBroker {
    pub fn new(services: GenericServices) -> Self {
        Self { services }
    }

    pub fn new_read_transaction(&self) -> TypedReadTransaction {
        TypedReadTransaction::new(
            self.services.codec.clone(),
            self.services.store.new_read_transaction(),
        )
    }

    pub fn new_write_transaction(&self) -> TypedWriteTransaction {
        TypedWriteTransaction::new(
            self.services.codec.clone(),
            self.services.store.new_write_transaction(),
        )
    }

    pub fn new_read_write_transaction(&self) -> TypedReadWriteTransaction {
        TypedReadWriteTransaction::new(
            self.services.codec.clone(),
            self.services.store.new_read_write_transaction(),
        )
    }

    pub fn create_chain(&self, listener: Arc<dyn TypedChainListener>) -> TypedTransactionChain {
        TypedTransactionChain::new(
            self.services.codec.clone(),
            self.services.store.as_ref(),
            listener,
        )
    }

    /// Register for changes under a typed scope; wildcarded scopes are
    /// legal and deliver one view per affected list entry.
    pub fn register_tree_change_listener(
        &self,
        scope: &TypedPath,
        listener: Arc<dyn TypedTreeChangeListener>,
    ) -> DispatchResult<ListenerRegistration> {
        splice_dispatch::register_tree_change_listener(
            &self.services.codec,
            self.services.store.as_ref(),
            scope,
            listener,
        )
    }
}

/// Typed publish and subscribe over the notification bus.
pub struct TypedNotificationService {
    services: GenericServices,
    publisher: TypedNotificationPublisher,
}

impl TypedNotificationService {
    pub fn new(services: GenericServices) -> Self {
        let publisher = TypedNotificationPublisher::new(
            services.codec.clone(),
            Arc::clone(&services.notifications),
        );
        Self {
            services,
            publisher,
        }
    }

    pub fn publish<T: DataObject>(&self, event: &T) -> DispatchResult<()> {
        self.publisher.publish(event)
    }

    pub fn publish_object(&self, event: TypedObject) -> DispatchResult<()> {
        self.publisher.publish_object(event)
    }

    pub fn register_listener(
        &self,
        listener: Arc<dyn TypedNotificationListener>,
    ) -> DispatchResult<ListenerRegistration> {
        splice_dispatch::register_notification_listener(
            &self.services.codec,
            self.services.notifications.as_ref(),
            listener,
        )
    }
}

/// Builds consumer-side dispatch tables.
pub struct TypedRpcConsumerRegistry {
    services: GenericServices,
}

impl TypedRpcConsumerRegistry {
    pub fn new(services: GenericServices) -> Self {
        Self { services }
    }

    /// One dispatch table covering the given operations.
    pub fn invoker(&self, ops: &[NodeId]) -> DispatchResult<TypedRpcInvoker> {
        TypedRpcInvoker::new(
            self.services.codec.clone(),
            Arc::clone(&self.services.rpc),
            ops,
        )
    }
}

/// Registers provider-side implementations.
pub struct TypedRpcProviderRegistry {
    services: GenericServices,
}

impl TypedRpcProviderRegistry {
    pub fn new(services: GenericServices) -> Self {
        Self { services }
    }

    pub fn register(
        &self,
        ops: &[NodeId],
        routes: &[TypedPath],
        implementation: Arc<dyn TypedRpcImplementation>,
    ) -> DispatchResult<RpcProviderAdapter> {
        RpcProviderAdapter::register(
            &self.services.codec,
            self.services.rpc.as_ref(),
            ops,
            routes,
            implementation,
        )
    }
}
