//! RPC consumer and provider adapters.
//!
//! Both sides wrap typed values in lazy payloads, so an invocation that
//! stays in-process moves the original `TypedObject` end to end and never
//! touches the codec. Routed operations extract the routing path from the
//! input through a precompiled per-class accessor.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use async_trait::async_trait;
use tracing::debug;

use splice_codec::{BindingCodec, CodecError};
use splice_store::{
    LazyPayload, ListenerRegistration, Payload, RpcBus, RpcError, RpcHandler, RpcRequest,
    RpcResult, StoreError, StoreResult,
};
use splice_types::{ClassId, GenericNode, GenericPath, NodeId, Scalar, TypedObject, TypedPath};

use crate::error::DispatchResult;

#[derive(Clone, Copy)]
enum Direction {
    Input,
    Output,
}

/// Lazy body of an RPC input or output.
pub struct LazyRpcPayload {
    codec: BindingCodec,
    op: NodeId,
    direction: Direction,
    object: TypedObject,
    encoded: OnceLock<Result<GenericNode, String>>,
}

impl LazyRpcPayload {
    fn new(codec: BindingCodec, op: NodeId, direction: Direction, object: TypedObject) -> Self {
        Self {
            codec,
            op,
            direction,
            object,
            encoded: OnceLock::new(),
        }
    }

    pub fn input(codec: BindingCodec, op: NodeId, object: TypedObject) -> Self {
        Self::new(codec, op, Direction::Input, object)
    }

    pub fn output(codec: BindingCodec, op: NodeId, object: TypedObject) -> Self {
        Self::new(codec, op, Direction::Output, object)
    }

    /// The wrapped typed value; the in-process fast path reads this.
    pub fn object(&self) -> &TypedObject {
        &self.object
    }
}

impl LazyPayload for LazyRpcPayload {
    fn encode(&self) -> StoreResult<GenericNode> {
        self.encoded
            .get_or_init(|| {
                let encoded = match self.direction {
                    Direction::Input => self.codec.encode_rpc_input(&self.op, &self.object),
                    Direction::Output => self.codec.encode_rpc_output(&self.op, &self.object),
                };
                encoded.map_err(|e| e.to_string())
            })
            .clone()
            .map_err(StoreError::Encoding)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Precompiled accessor for the routing path a routed operation's input
/// carries.
struct RouteExtractor {
    field: String,
}

impl RouteExtractor {
    fn extract(&self, input: &TypedObject) -> DispatchResult<GenericPath> {
        let value = input.field(&self.field).ok_or_else(|| {
            CodecError::Serialization(format!(
                "input {} lacks routing field {}",
                input.class(),
                self.field
            ))
        })?;
        match Scalar::from_json(value) {
            Ok(Scalar::Path(path)) => Ok(path),
            _ => Err(CodecError::Serialization(format!(
                "routing field {} of {} does not carry a path",
                self.field,
                input.class()
            ))
            .into()),
        }
    }
}

/// Process-wide accessor cache keyed by input class.
///
/// Construction is a pure function of the class's schema definition, so a
/// populate race resolves to first-writer-wins with identical results.
fn route_extractor(class: &ClassId, field: &str) -> Arc<RouteExtractor> {
    static EXTRACTORS: OnceLock<RwLock<HashMap<ClassId, Arc<RouteExtractor>>>> = OnceLock::new();
    let cache = EXTRACTORS.get_or_init(|| RwLock::new(HashMap::new()));
    if let Some(found) = cache.read().expect("extractor lock poisoned").get(class) {
        return Arc::clone(found);
    }
    let mut cache = cache.write().expect("extractor lock poisoned");
    Arc::clone(cache.entry(class.clone()).or_insert_with(|| {
        Arc::new(RouteExtractor {
            field: field.to_string(),
        })
    }))
}

fn unwrap_typed(payload: &Payload) -> Option<TypedObject> {
    payload
        .lazy_ref()
        .and_then(|lazy| lazy.as_any().downcast_ref::<LazyRpcPayload>())
        .map(|wrapped| wrapped.object().clone())
}

struct OpEntry {
    context_field: Option<String>,
}

/// Consumer-side dispatch table, built once per interface.
///
/// Each declared operation resolves its definition against the schema at
/// construction; invocation afterwards is a table lookup plus a bus call.
pub struct TypedRpcInvoker {
    codec: BindingCodec,
    bus: Arc<dyn RpcBus>,
    ops: HashMap<NodeId, OpEntry>,
}

impl TypedRpcInvoker {
    pub fn new(
        codec: BindingCodec,
        bus: Arc<dyn RpcBus>,
        ops: &[NodeId],
    ) -> DispatchResult<Self> {
        let snapshot = codec.snapshot();
        let mut table = HashMap::with_capacity(ops.len());
        for op in ops {
            let def = snapshot
                .rpc(op)
                .ok_or_else(|| CodecError::InvalidPath(format!("unknown operation {op}")))?;
            table.insert(
                op.clone(),
                OpEntry {
                    context_field: def.context_field().map(str::to_string),
                },
            );
        }
        Ok(Self {
            codec,
            bus,
            ops: table,
        })
    }

    /// Invoke an operation with a typed input.
    ///
    /// The input serializes lazily; for routed operations the routing path
    /// is extracted and pre-encoded so the bus never inspects the body.
    pub async fn invoke(
        &self,
        op: &NodeId,
        input: TypedObject,
    ) -> DispatchResult<Option<TypedObject>> {
        let entry = self
            .ops
            .get(op)
            .ok_or_else(|| RpcError::NoImplementation(op.clone()))?;
        let route = match &entry.context_field {
            Some(field) => Some(route_extractor(input.class(), field).extract(&input)?),
            None => None,
        };
        debug!(%op, route = route.as_ref().map(tracing::field::display), "invoking operation");
        let payload = Payload::lazy(Arc::new(LazyRpcPayload::input(
            self.codec.clone(),
            op.clone(),
            input,
        )));
        let request = match route {
            Some(route) => RpcRequest::routed(payload, route),
            None => RpcRequest::new(payload),
        };
        match self.bus.invoke(op, request).await? {
            Some(output) => Ok(Some(self.decode_output(op, &output)?)),
            None => Ok(None),
        }
    }

    fn decode_output(&self, op: &NodeId, payload: &Payload) -> DispatchResult<TypedObject> {
        if let Some(object) = unwrap_typed(payload) {
            return Ok(object);
        }
        let node = payload.node()?;
        Ok(self.codec.decode_rpc_output(op, &node)?)
    }
}

/// A typed RPC implementation covering one or more operations.
#[async_trait]
pub trait TypedRpcImplementation: Send + Sync {
    async fn invoke(&self, op: &NodeId, input: TypedObject) -> RpcResult<Option<TypedObject>>;
}

struct ProviderHandler {
    codec: BindingCodec,
    op: NodeId,
    implementation: Arc<dyn TypedRpcImplementation>,
}

impl ProviderHandler {
    fn decode_input(&self, payload: &Payload) -> DispatchResult<TypedObject> {
        if let Some(object) = unwrap_typed(payload) {
            return Ok(object);
        }
        let node = payload.node()?;
        Ok(self.codec.decode_rpc_input(&self.op, &node)?)
    }
}

#[async_trait]
impl RpcHandler for ProviderHandler {
    async fn invoke(&self, request: RpcRequest) -> RpcResult<Option<Payload>> {
        let input = self
            .decode_input(&request.payload)
            .map_err(|e| RpcError::Failed(e.to_string()))?;
        let output = self.implementation.invoke(&self.op, input).await?;
        Ok(output.map(|object| {
            Payload::lazy(Arc::new(LazyRpcPayload::output(
                self.codec.clone(),
                self.op.clone(),
                object,
            )))
        }))
    }
}

/// Provider-side registration handle.
///
/// Each operation registers globally; a routed operation additionally
/// registers under every declared route so route-directed invocations land
/// here even after another provider replaces the global slot.
pub struct RpcProviderAdapter {
    registrations: Vec<ListenerRegistration>,
}

impl RpcProviderAdapter {
    pub fn register(
        codec: &BindingCodec,
        bus: &dyn RpcBus,
        ops: &[NodeId],
        routes: &[TypedPath],
        implementation: Arc<dyn TypedRpcImplementation>,
    ) -> DispatchResult<Self> {
        let snapshot = codec.snapshot();
        let mut registrations = Vec::new();
        for op in ops {
            let def = snapshot
                .rpc(op)
                .ok_or_else(|| CodecError::InvalidPath(format!("unknown operation {op}")))?;
            let handler: Arc<dyn RpcHandler> = Arc::new(ProviderHandler {
                codec: codec.clone(),
                op: op.clone(),
                implementation: Arc::clone(&implementation),
            });
            if def.is_routed() {
                for route in routes {
                    let encoded = codec.encode_path(route)?;
                    registrations.push(bus.register(op.clone(), Some(encoded), Arc::clone(&handler)));
                }
            }
            registrations.push(bus.register(op.clone(), None, handler));
        }
        Ok(Self { registrations })
    }

    /// Withdraw every registration this provider holds.
    pub fn close(self) {
        for registration in self.registrations {
            registration.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DispatchError;
    use serde_json::json;
    use splice_schema::{SchemaBuilder, SchemaSnapshot, SchemaTracker};
    use splice_store::InMemoryRpcBus;
    use splice_types::ListKey;
    use std::sync::Mutex;

    fn snapshot() -> Arc<SchemaSnapshot> {
        SchemaBuilder::new("toaster", 1)
            .container("toasters", |c| {
                c.class("Toasters")
                    .list("toaster", &["name"], |l| l.class("Toaster").leaf("name"))
            })
            .rpc("make-toast", |r| {
                r.input(|i| i.class("MakeToastInput").leaf("doneness"))
                    .output(|o| o.class("MakeToastOutput").leaf("status"))
            })
            .rpc("restock", |r| {
                r.routed("toaster-ref")
                    .input(|i| i.class("RestockInput").leaf("toaster-ref").leaf("amount"))
            })
            .build()
    }

    fn codec() -> BindingCodec {
        BindingCodec::new(Arc::new(SchemaTracker::new(snapshot())))
    }

    fn op(name: &str) -> NodeId {
        NodeId::new("toaster", name)
    }

    fn toaster_path(name: &str) -> TypedPath {
        TypedPath::of("Toasters").entry("Toaster", ListKey::single("name", name))
    }

    fn restock_input(codec: &BindingCodec, toaster: &str, amount: i64) -> TypedObject {
        let route = codec.encode_path(&toaster_path(toaster)).unwrap();
        TypedObject::new(
            "RestockInput",
            json!({
                "toaster-ref": serde_json::to_value(&route).unwrap(),
                "amount": amount,
            }),
        )
    }

    struct Kitchen {
        label: &'static str,
        invocations: Mutex<Vec<(NodeId, TypedObject)>>,
    }

    impl Kitchen {
        fn new(label: &'static str) -> Arc<Self> {
            Arc::new(Self {
                label,
                invocations: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TypedRpcImplementation for Kitchen {
        async fn invoke(&self, op: &NodeId, input: TypedObject) -> RpcResult<Option<TypedObject>> {
            self.invocations
                .lock()
                .unwrap()
                .push((op.clone(), input.clone()));
            if op.name() == "make-toast" {
                Ok(Some(TypedObject::new(
                    "MakeToastOutput",
                    json!({"status": format!("done by {}", self.label)}),
                )))
            } else {
                Ok(None)
            }
        }
    }

    #[tokio::test]
    async fn in_process_invocation_moves_typed_objects_end_to_end() {
        let codec = codec();
        let bus = Arc::new(InMemoryRpcBus::new());
        let kitchen = Kitchen::new("main");
        let _provider = RpcProviderAdapter::register(
            &codec,
            bus.as_ref(),
            &[op("make-toast")],
            &[],
            Arc::clone(&kitchen) as Arc<dyn TypedRpcImplementation>,
        )
        .unwrap();

        let invoker = TypedRpcInvoker::new(codec, bus, &[op("make-toast")]).unwrap();
        let input = TypedObject::new("MakeToastInput", json!({"doneness": 7}));
        let output = invoker
            .invoke(&op("make-toast"), input.clone())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(output.field("status"), Some(&json!("done by main")));
        // The provider saw the original object, not a decoded copy.
        let invocations = kitchen.invocations.lock().unwrap();
        assert_eq!(invocations.as_slice(), &[(op("make-toast"), input)]);
    }

    #[tokio::test]
    async fn routed_invocation_lands_on_the_route_owner() {
        let codec = codec();
        let bus = Arc::new(InMemoryRpcBus::new());
        let owner = Kitchen::new("owner");
        let fallback = Kitchen::new("fallback");
        let _owner_reg = RpcProviderAdapter::register(
            &codec,
            bus.as_ref(),
            &[op("restock")],
            &[toaster_path("t1")],
            Arc::clone(&owner) as Arc<dyn TypedRpcImplementation>,
        )
        .unwrap();
        let _fallback_reg = RpcProviderAdapter::register(
            &codec,
            bus.as_ref(),
            &[op("restock")],
            &[],
            Arc::clone(&fallback) as Arc<dyn TypedRpcImplementation>,
        )
        .unwrap();

        let invoker = TypedRpcInvoker::new(codec.clone(), bus, &[op("restock")]).unwrap();
        let to_owned = restock_input(&codec, "t1", 12);
        assert!(invoker
            .invoke(&op("restock"), to_owned)
            .await
            .unwrap()
            .is_none());
        let elsewhere = restock_input(&codec, "t2", 3);
        invoker.invoke(&op("restock"), elsewhere).await.unwrap();

        assert_eq!(owner.invocations.lock().unwrap().len(), 1);
        assert_eq!(fallback.invocations.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn input_without_routing_field_is_rejected() {
        let codec = codec();
        let bus = Arc::new(InMemoryRpcBus::new());
        let invoker = TypedRpcInvoker::new(codec, bus, &[op("restock")]).unwrap();

        let input = TypedObject::new("RestockInput", json!({"amount": 3}));
        let err = invoker.invoke(&op("restock"), input).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Codec(CodecError::Serialization(_))
        ));
    }

    #[test]
    fn unknown_operation_fails_table_construction() {
        let codec = codec();
        let bus: Arc<dyn RpcBus> = Arc::new(InMemoryRpcBus::new());
        assert!(matches!(
            TypedRpcInvoker::new(codec.clone(), Arc::clone(&bus), &[op("absent")]),
            Err(DispatchError::Codec(CodecError::InvalidPath(_)))
        ));
        assert!(RpcProviderAdapter::register(
            &codec,
            &InMemoryRpcBus::new(),
            &[op("absent")],
            &[],
            Kitchen::new("x") as Arc<dyn TypedRpcImplementation>,
        )
        .is_err());
    }

    #[tokio::test]
    async fn undeclared_operation_has_no_implementation() {
        let codec = codec();
        let bus = Arc::new(InMemoryRpcBus::new());
        let invoker = TypedRpcInvoker::new(codec, bus, &[op("make-toast")]).unwrap();

        let input = TypedObject::new("RestockInput", json!({"amount": 3}));
        let err = invoker.invoke(&op("restock"), input).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Rpc(RpcError::NoImplementation(_))
        ));
    }

    #[tokio::test]
    async fn closed_provider_withdraws_every_registration() {
        let codec = codec();
        let bus = Arc::new(InMemoryRpcBus::new());
        let kitchen = Kitchen::new("main");
        let provider = RpcProviderAdapter::register(
            &codec,
            bus.as_ref(),
            &[op("restock")],
            &[toaster_path("t1")],
            Arc::clone(&kitchen) as Arc<dyn TypedRpcImplementation>,
        )
        .unwrap();
        provider.close();

        let invoker = TypedRpcInvoker::new(codec.clone(), bus, &[op("restock")]).unwrap();
        let err = invoker
            .invoke(&op("restock"), restock_input(&codec, "t1", 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Rpc(RpcError::NoImplementation(_))
        ));
    }

    #[test]
    fn lazy_input_encodes_for_generic_consumers() {
        let codec = codec();
        let input = TypedObject::new("MakeToastInput", json!({"doneness": 5}));
        let payload = LazyRpcPayload::input(codec.clone(), op("make-toast"), input.clone());
        let node = payload.encode().unwrap();
        let decoded = codec.decode_rpc_input(&op("make-toast"), &node).unwrap();
        assert_eq!(decoded, input);
    }
}
