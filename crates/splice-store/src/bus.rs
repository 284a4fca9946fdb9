//! In-memory notification and RPC buses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::debug;

use splice_types::{GenericPath, NodeId};

use crate::error::{RpcError, RpcResult, StoreResult};
use crate::traits::{
    GenericNotification, ListenerRegistration, NotificationBus, NotificationListener, Payload,
    RpcBus, RpcHandler, RpcRequest,
};

struct NotificationEntry {
    id: u64,
    paths: Vec<NodeId>,
    listener: Arc<dyn NotificationListener>,
}

struct NotificationInner {
    listeners: RwLock<Vec<NotificationEntry>>,
    next: AtomicU64,
}

/// Synchronous fan-out of notifications by schema path.
#[derive(Clone)]
pub struct InMemoryNotificationBus {
    inner: Arc<NotificationInner>,
}

impl InMemoryNotificationBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(NotificationInner {
                listeners: RwLock::new(Vec::new()),
                next: AtomicU64::new(0),
            }),
        }
    }
}

impl Default for InMemoryNotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBus for InMemoryNotificationBus {
    fn publish(&self, notification: GenericNotification) -> StoreResult<()> {
        let targets: Vec<Arc<dyn NotificationListener>> = {
            let listeners = self.inner.listeners.read().expect("bus lock poisoned");
            listeners
                .iter()
                .filter(|e| e.paths.contains(&notification.path))
                .map(|e| Arc::clone(&e.listener))
                .collect()
        };
        debug!(path = %notification.path, listeners = targets.len(), "publishing notification");
        for listener in targets {
            listener.on_notification(&notification);
        }
        Ok(())
    }

    fn register_listener(
        &self,
        paths: Vec<NodeId>,
        listener: Arc<dyn NotificationListener>,
    ) -> ListenerRegistration {
        let id = self.inner.next.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .write()
            .expect("bus lock poisoned")
            .push(NotificationEntry {
                id,
                paths,
                listener,
            });
        let weak = Arc::downgrade(&self.inner);
        ListenerRegistration::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .listeners
                    .write()
                    .expect("bus lock poisoned")
                    .retain(|e| e.id != id);
            }
        })
    }
}

type RpcKey = (NodeId, Option<GenericPath>);

struct RpcInner {
    handlers: RwLock<HashMap<RpcKey, Arc<dyn RpcHandler>>>,
}

/// Route-aware RPC dispatch. A later registration on the same key replaces
/// the earlier one.
#[derive(Clone)]
pub struct InMemoryRpcBus {
    inner: Arc<RpcInner>,
}

impl InMemoryRpcBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RpcInner {
                handlers: RwLock::new(HashMap::new()),
            }),
        }
    }
}

impl Default for InMemoryRpcBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RpcBus for InMemoryRpcBus {
    fn register(
        &self,
        path: NodeId,
        route: Option<GenericPath>,
        handler: Arc<dyn RpcHandler>,
    ) -> ListenerRegistration {
        let key = (path, route);
        self.inner
            .handlers
            .write()
            .expect("bus lock poisoned")
            .insert(key.clone(), handler);
        let weak = Arc::downgrade(&self.inner);
        ListenerRegistration::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .handlers
                    .write()
                    .expect("bus lock poisoned")
                    .remove(&key);
            }
        })
    }

    async fn invoke(&self, path: &NodeId, request: RpcRequest) -> RpcResult<Option<Payload>> {
        let handler = {
            let handlers = self.inner.handlers.read().expect("bus lock poisoned");
            let routed = request
                .route
                .as_ref()
                .and_then(|route| handlers.get(&(path.clone(), Some(route.clone()))));
            routed
                .or_else(|| handlers.get(&(path.clone(), None)))
                .map(Arc::clone)
        };
        match handler {
            Some(handler) => handler.invoke(request).await,
            None => Err(RpcError::NoImplementation(path.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcError;
    use splice_types::{GenericNode, GenericStep, Scalar};
    use std::sync::Mutex;

    fn nid(name: &str) -> NodeId {
        NodeId::new("net", name)
    }

    struct Recorder {
        seen: Mutex<Vec<NodeId>>,
    }

    impl NotificationListener for Recorder {
        fn on_notification(&self, notification: &GenericNotification) {
            self.seen.lock().unwrap().push(notification.path.clone());
        }
    }

    #[test]
    fn notifications_fan_out_by_path() {
        let bus = InMemoryNotificationBus::new();
        let interested = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        let other = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        let _a = bus.register_listener(
            vec![nid("link-up")],
            Arc::clone(&interested) as Arc<dyn NotificationListener>,
        );
        let _b = bus.register_listener(
            vec![nid("link-down")],
            Arc::clone(&other) as Arc<dyn NotificationListener>,
        );

        bus.publish(GenericNotification::encoded(
            nid("link-up"),
            GenericNode::container(nid("link-up")),
        ))
        .unwrap();

        assert_eq!(interested.seen.lock().unwrap().as_slice(), &[nid("link-up")]);
        assert!(other.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn closed_notification_registration_stops_delivery() {
        let bus = InMemoryNotificationBus::new();
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        let reg = bus.register_listener(
            vec![nid("link-up")],
            Arc::clone(&recorder) as Arc<dyn NotificationListener>,
        );
        reg.close();

        bus.publish(GenericNotification::encoded(
            nid("link-up"),
            GenericNode::container(nid("link-up")),
        ))
        .unwrap();
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    struct Tagger {
        tag: i64,
    }

    #[async_trait]
    impl RpcHandler for Tagger {
        async fn invoke(&self, _request: RpcRequest) -> RpcResult<Option<Payload>> {
            Ok(Some(Payload::Encoded(GenericNode::leaf(
                nid("tag"),
                Scalar::Int(self.tag),
            ))))
        }
    }

    fn route_to(name: &str) -> GenericPath {
        GenericPath::root().child(GenericStep::Node(nid(name)))
    }

    #[tokio::test]
    async fn routed_handler_is_preferred_over_global() {
        let bus = InMemoryRpcBus::new();
        let _global = bus.register(nid("restock"), None, Arc::new(Tagger { tag: 1 }));
        let _routed = bus.register(
            nid("restock"),
            Some(route_to("n1")),
            Arc::new(Tagger { tag: 2 }),
        );

        let routed = bus
            .invoke(
                &nid("restock"),
                RpcRequest::routed(GenericNode::container(nid("input")), route_to("n1")),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            routed.node().unwrap(),
            GenericNode::leaf(nid("tag"), Scalar::Int(2))
        );

        // A route nobody registered falls back to the global handler.
        let fallback = bus
            .invoke(
                &nid("restock"),
                RpcRequest::routed(GenericNode::container(nid("input")), route_to("n2")),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            fallback.node().unwrap(),
            GenericNode::leaf(nid("tag"), Scalar::Int(1))
        );
    }

    #[tokio::test]
    async fn unknown_operation_has_no_implementation() {
        let bus = InMemoryRpcBus::new();
        let result = bus
            .invoke(
                &nid("restock"),
                RpcRequest::new(GenericNode::container(nid("input"))),
            )
            .await;
        assert!(matches!(result, Err(RpcError::NoImplementation(_))));
    }

    #[tokio::test]
    async fn closed_rpc_registration_removes_handler() {
        let bus = InMemoryRpcBus::new();
        let reg = bus.register(nid("restock"), None, Arc::new(Tagger { tag: 1 }));
        reg.close();

        let result = bus
            .invoke(
                &nid("restock"),
                RpcRequest::new(GenericNode::container(nid("input"))),
            )
            .await;
        assert!(matches!(result, Err(RpcError::NoImplementation(_))));
    }
}
