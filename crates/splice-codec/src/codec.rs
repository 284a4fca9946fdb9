//! The codec facade: one handle bundling the schema tracker and config.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use splice_schema::{
    SchemaError, SchemaNode, SchemaSnapshot, SchemaTracker, StructuralKind,
};
use splice_types::{
    ClassId, GenericNode, GenericPath, GenericStep, NodeId, TypedObject, TypedPath,
};

use crate::error::{CodecError, CodecResult};
use crate::{object, ops, path};

/// Codec configuration.
#[derive(Clone, Debug)]
pub struct CodecConfig {
    /// Upper bound on the blocking schema wait of
    /// [`BindingCodec::encode_path_blocking`].
    pub schema_wait: Duration,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            schema_wait: Duration::from_secs(5),
        }
    }
}

/// Schema-driven codec between the typed and generic representations.
///
/// Stateless per schema generation: every operation resolves one snapshot
/// up front and uses only it, so no operation observes a mix of two
/// generations. Cheap to clone and share.
#[derive(Clone)]
pub struct BindingCodec {
    tracker: Arc<SchemaTracker>,
    config: CodecConfig,
}

impl BindingCodec {
    pub fn new(tracker: Arc<SchemaTracker>) -> Self {
        Self::with_config(tracker, CodecConfig::default())
    }

    pub fn with_config(tracker: Arc<SchemaTracker>, config: CodecConfig) -> Self {
        Self { tracker, config }
    }

    /// The current schema generation.
    pub fn snapshot(&self) -> Arc<SchemaSnapshot> {
        self.tracker.current()
    }

    /// Encode a typed path against the current snapshot.
    pub fn encode_path(&self, path: &TypedPath) -> CodecResult<GenericPath> {
        path::encode_path(&self.snapshot(), path)
    }

    /// Encode a typed path, waiting (bounded) for a schema generation that
    /// knows every class on the path before giving up.
    ///
    /// The only blocking operation of this layer: a freshly generated class
    /// may be ahead of the installed schema for a moment during an update.
    pub fn encode_path_blocking(&self, path: &TypedPath) -> CodecResult<GenericPath> {
        match path::encode_path(&self.snapshot(), path) {
            Err(CodecError::InvalidPath(reason)) => {
                debug!(%path, reason, "path does not resolve, waiting for schema");
                let snapshot = self
                    .tracker
                    .wait_for(self.config.schema_wait, |snap| {
                        path.steps().iter().all(|s| snap.knows_class(s.class()))
                    })
                    .map_err(|e| match e {
                        SchemaError::Timeout { waited } => CodecError::SchemaTimeout { waited },
                        other => CodecError::InvalidPath(other.to_string()),
                    })?;
                path::encode_path(&snapshot, path)
            }
            other => other,
        }
    }

    /// Decode a generic path against the current snapshot.
    pub fn decode_path(&self, path: &GenericPath) -> CodecResult<TypedPath> {
        path::decode_path(&self.snapshot(), path)
    }

    /// Encode a typed object at a typed path.
    pub fn encode_object(
        &self,
        path: &TypedPath,
        object: &TypedObject,
    ) -> CodecResult<(GenericPath, GenericNode)> {
        object::encode_object(&self.snapshot(), path, object)
    }

    /// Decode a generic subtree at a typed path.
    pub fn decode_object(
        &self,
        path: &TypedPath,
        node: &GenericNode,
    ) -> CodecResult<TypedObject> {
        object::decode_object(&self.snapshot(), path, node)
    }

    /// Default-empty nodes for every ancestor of a typed path.
    pub fn default_ancestors(
        &self,
        path: &TypedPath,
    ) -> CodecResult<Vec<(GenericPath, GenericNode)>> {
        object::default_ancestors(&self.snapshot(), path)
    }

    pub fn encode_rpc_input(&self, rpc: &NodeId, input: &TypedObject) -> CodecResult<GenericNode> {
        ops::encode_rpc_input(&self.snapshot(), rpc, input)
    }

    pub fn decode_rpc_input(&self, rpc: &NodeId, node: &GenericNode) -> CodecResult<TypedObject> {
        ops::decode_rpc_input(&self.snapshot(), rpc, node)
    }

    pub fn encode_rpc_output(
        &self,
        rpc: &NodeId,
        output: &TypedObject,
    ) -> CodecResult<GenericNode> {
        ops::encode_rpc_output(&self.snapshot(), rpc, output)
    }

    pub fn decode_rpc_output(&self, rpc: &NodeId, node: &GenericNode) -> CodecResult<TypedObject> {
        ops::decode_rpc_output(&self.snapshot(), rpc, node)
    }

    pub fn encode_notification(
        &self,
        notification: &TypedObject,
    ) -> CodecResult<(NodeId, GenericNode)> {
        ops::encode_notification(&self.snapshot(), notification)
    }

    pub fn decode_notification(
        &self,
        id: &NodeId,
        node: &GenericNode,
    ) -> CodecResult<TypedObject> {
        ops::decode_notification(&self.snapshot(), id, node)
    }

    pub fn notification_path(&self, class: &ClassId) -> CodecResult<NodeId> {
        ops::notification_path(&self.snapshot(), class)
    }
}

/// Classify the child a generic step addresses within a schema node.
///
/// Pure and total; used by the delta layer to decide visibility and
/// collapse rules.
pub fn classify(parent: &SchemaNode, step: &GenericStep) -> StructuralKind {
    parent.classify_child(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_schema::SchemaBuilder;
    use splice_types::ListKey;

    fn snapshot(generation: u64, with_nodes: bool) -> Arc<SchemaSnapshot> {
        let builder = SchemaBuilder::new("net", generation);
        if with_nodes {
            builder
                .container("nodes", |c| {
                    c.class("Nodes")
                        .list("node", &["name"], |l| l.class("Node").leaf("name").leaf("mtu"))
                })
                .build()
        } else {
            builder.build()
        }
    }

    fn entry_path() -> TypedPath {
        TypedPath::of("Nodes").entry("Node", ListKey::single("name", "n1"))
    }

    #[test]
    fn blocking_encode_succeeds_immediately_when_known() {
        let tracker = Arc::new(SchemaTracker::new(snapshot(1, true)));
        let codec = BindingCodec::new(tracker);
        assert!(codec.encode_path_blocking(&entry_path()).is_ok());
    }

    #[test]
    fn blocking_encode_waits_for_schema_push() {
        let tracker = Arc::new(SchemaTracker::new(snapshot(1, false)));
        let codec = BindingCodec::with_config(
            Arc::clone(&tracker),
            CodecConfig {
                schema_wait: Duration::from_secs(5),
            },
        );

        let pusher = Arc::clone(&tracker);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            pusher.update(snapshot(2, true));
        });

        let generic = codec.encode_path_blocking(&entry_path()).unwrap();
        assert_eq!(generic.len(), 3);
        handle.join().unwrap();
    }

    #[test]
    fn blocking_encode_times_out_on_unknown_class() {
        let tracker = Arc::new(SchemaTracker::new(snapshot(1, false)));
        let codec = BindingCodec::with_config(
            tracker,
            CodecConfig {
                schema_wait: Duration::from_millis(20),
            },
        );
        assert!(matches!(
            codec.encode_path_blocking(&entry_path()),
            Err(CodecError::SchemaTimeout { .. })
        ));
    }

    #[test]
    fn non_blocking_encode_fails_fast() {
        let tracker = Arc::new(SchemaTracker::new(snapshot(1, false)));
        let codec = BindingCodec::new(tracker);
        assert!(matches!(
            codec.encode_path(&entry_path()),
            Err(CodecError::InvalidPath(_))
        ));
    }
}
