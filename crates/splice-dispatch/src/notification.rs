//! Notification adapters for both directions of the bus.
//!
//! Publishing wraps the typed value in a lazy payload so in-process
//! listeners never pay for an encode/decode round trip; the generic form
//! materializes only when a generic consumer asks, and is then cached.

use std::any::Any;
use std::sync::{Arc, OnceLock};

use tracing::warn;

use splice_codec::{BindingCodec, CodecError};
use splice_store::{
    GenericNotification, LazyPayload, ListenerRegistration, NotificationBus,
    NotificationListener, StoreError, StoreResult,
};
use splice_types::{ClassId, DataObject, GenericNode, TypedObject};

use crate::error::DispatchResult;

/// Publish-side lazy body: holds the typed value, encodes on first generic
/// access.
///
/// The cached result covers failures too; an unencodable value reports the
/// same error to every generic reader. Concurrent first reads may both
/// encode, the cache keeps whichever lands first.
pub struct LazyNotificationPayload {
    codec: BindingCodec,
    object: TypedObject,
    encoded: OnceLock<Result<GenericNode, String>>,
}

impl LazyNotificationPayload {
    pub fn new(codec: BindingCodec, object: TypedObject) -> Self {
        Self {
            codec,
            object,
            encoded: OnceLock::new(),
        }
    }

    /// The wrapped typed value; the in-process fast path reads this.
    pub fn object(&self) -> &TypedObject {
        &self.object
    }
}

impl LazyPayload for LazyNotificationPayload {
    fn encode(&self) -> StoreResult<GenericNode> {
        self.encoded
            .get_or_init(|| {
                self.codec
                    .encode_notification(&self.object)
                    .map(|(_, body)| body)
                    .map_err(|e| e.to_string())
            })
            .clone()
            .map_err(StoreError::Encoding)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Typed publish facade over a [`NotificationBus`].
#[derive(Clone)]
pub struct TypedNotificationPublisher {
    codec: BindingCodec,
    bus: Arc<dyn NotificationBus>,
}

impl TypedNotificationPublisher {
    pub fn new(codec: BindingCodec, bus: Arc<dyn NotificationBus>) -> Self {
        Self { codec, bus }
    }

    /// Publish a typed event. The path resolves eagerly, the body lazily.
    pub fn publish<T: DataObject>(&self, event: &T) -> DispatchResult<()> {
        let object = TypedObject::from_data(event)
            .map_err(|e| CodecError::Serialization(e.to_string()))?;
        self.publish_object(object)
    }

    /// Dynamic variant of [`publish`](Self::publish).
    pub fn publish_object(&self, object: TypedObject) -> DispatchResult<()> {
        let path = self.codec.notification_path(object.class())?;
        let payload = Arc::new(LazyNotificationPayload::new(self.codec.clone(), object));
        self.bus.publish(GenericNotification::lazy(path, payload))?;
        Ok(())
    }
}

/// Typed counterpart of [`NotificationListener`].
pub trait TypedNotificationListener: Send + Sync {
    /// Notification classes this listener wants. Translated to generic
    /// paths exactly once, at registration.
    fn supported_classes(&self) -> Vec<ClassId>;

    fn on_notification(&self, notification: TypedObject);
}

struct NotificationAdapter {
    codec: BindingCodec,
    listener: Arc<dyn TypedNotificationListener>,
}

impl NotificationListener for NotificationAdapter {
    fn on_notification(&self, notification: &GenericNotification) {
        // In-process fast path: a payload published through this layer
        // still holds the original typed value.
        if let Some(wrapped) = notification
            .payload
            .lazy_ref()
            .and_then(|lazy| lazy.as_any().downcast_ref::<LazyNotificationPayload>())
        {
            self.listener.on_notification(wrapped.object().clone());
            return;
        }
        let node = match notification.node() {
            Ok(node) => node,
            Err(error) => {
                warn!(path = %notification.path, %error, "dropping unencodable notification");
                return;
            }
        };
        match self.codec.decode_notification(&notification.path, &node) {
            Ok(object) => self.listener.on_notification(object),
            Err(error) => {
                warn!(path = %notification.path, %error, "dropping undecodable notification");
            }
        }
    }
}

/// Register a typed listener for its supported notification classes.
pub fn register_notification_listener(
    codec: &BindingCodec,
    bus: &dyn NotificationBus,
    listener: Arc<dyn TypedNotificationListener>,
) -> DispatchResult<ListenerRegistration> {
    let mut paths = Vec::new();
    for class in listener.supported_classes() {
        paths.push(codec.notification_path(&class)?);
    }
    let adapter = Arc::new(NotificationAdapter {
        codec: codec.clone(),
        listener,
    });
    Ok(bus.register_listener(paths, adapter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use splice_schema::{SchemaBuilder, SchemaSnapshot, SchemaTracker};
    use splice_store::InMemoryNotificationBus;
    use splice_types::NodeId;
    use std::sync::Mutex;

    fn snapshot() -> Arc<SchemaSnapshot> {
        SchemaBuilder::new("toaster", 1)
            .notification("toast-done", "ToastDone", |n| n.leaf("status"))
            .build()
    }

    fn codec() -> BindingCodec {
        BindingCodec::new(Arc::new(SchemaTracker::new(snapshot())))
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct ToastDone {
        status: String,
    }

    impl DataObject for ToastDone {
        fn binding_class() -> ClassId {
            ClassId::new("ToastDone")
        }
    }

    struct Recorder {
        seen: Mutex<Vec<TypedObject>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl TypedNotificationListener for Recorder {
        fn supported_classes(&self) -> Vec<ClassId> {
            vec![ClassId::new("ToastDone")]
        }

        fn on_notification(&self, notification: TypedObject) {
            self.seen.lock().unwrap().push(notification);
        }
    }

    #[test]
    fn published_event_reaches_typed_listener_without_encoding() {
        let codec = codec();
        let bus = Arc::new(InMemoryNotificationBus::new());
        let recorder = Recorder::new();
        let _reg = register_notification_listener(
            &codec,
            bus.as_ref(),
            Arc::clone(&recorder) as Arc<dyn TypedNotificationListener>,
        )
        .unwrap();

        let publisher = TypedNotificationPublisher::new(codec, bus);
        publisher
            .publish(&ToastDone {
                status: "golden".into(),
            })
            .unwrap();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].to_data::<ToastDone>().unwrap(),
            ToastDone {
                status: "golden".into()
            }
        );
    }

    #[test]
    fn encoded_notification_decodes_through_the_codec() {
        let codec = codec();
        let bus = InMemoryNotificationBus::new();
        let recorder = Recorder::new();
        let _reg = register_notification_listener(
            &codec,
            &bus,
            Arc::clone(&recorder) as Arc<dyn TypedNotificationListener>,
        )
        .unwrap();

        let event = TypedObject::new("ToastDone", serde_json::json!({"status": "burnt"}));
        let (path, body) = splice_codec::encode_notification(&codec.snapshot(), &event).unwrap();
        bus.publish(GenericNotification::encoded(path, body)).unwrap();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], event);
    }

    #[test]
    fn lazy_payload_encodes_once_for_generic_readers() {
        let codec = codec();
        let event = TypedObject::new("ToastDone", serde_json::json!({"status": "golden"}));
        let payload = LazyNotificationPayload::new(codec.clone(), event.clone());

        let first = payload.encode().unwrap();
        let second = payload.encode().unwrap();
        assert_eq!(first, second);
        let decoded = codec
            .decode_notification(&NodeId::new("toaster", "toast-done"), &first)
            .unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn unknown_class_fails_registration() {
        struct Wrong;
        impl TypedNotificationListener for Wrong {
            fn supported_classes(&self) -> Vec<ClassId> {
                vec![ClassId::new("Absent")]
            }
            fn on_notification(&self, _notification: TypedObject) {}
        }

        let codec = codec();
        let bus = InMemoryNotificationBus::new();
        assert!(matches!(
            register_notification_listener(&codec, &bus, Arc::new(Wrong)),
            Err(crate::error::DispatchError::Codec(
                CodecError::InvalidPath(_)
            ))
        ));
    }

    #[test]
    fn publish_of_unknown_class_fails() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Unmodeled {
            value: i64,
        }
        impl DataObject for Unmodeled {
            fn binding_class() -> ClassId {
                ClassId::new("Unmodeled")
            }
        }

        let publisher =
            TypedNotificationPublisher::new(codec(), Arc::new(InMemoryNotificationBus::new()));
        assert!(publisher.publish(&Unmodeled { value: 1 }).is_err());
    }
}
