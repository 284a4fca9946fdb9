//! The data-tree-change adapter: generic candidates in, typed views out.

use std::sync::Arc;

use tracing::warn;

use splice_candidate::Candidate;
use splice_codec::BindingCodec;
use splice_delta::DataTreeModification;
use splice_store::{GenericDataStore, GenericTreeChangeListener, ListenerRegistration};
use splice_types::TypedPath;

use crate::error::DispatchResult;

/// Typed counterpart of [`GenericTreeChangeListener`]: one call per commit,
/// carrying the whole batch.
pub trait TypedTreeChangeListener: Send + Sync {
    fn on_data_tree_changed(&self, changes: &[DataTreeModification]);
}

/// Wraps a typed listener for registration with the generic store.
///
/// Each candidate becomes one lazy [`DataTreeModification`]; nothing below
/// the root path is decoded until the listener asks. A candidate whose root
/// path no longer decodes against the current schema is skipped, so one bad
/// entry never blinds the listener to the rest of the batch.
pub struct TreeChangeAdapter {
    codec: BindingCodec,
    listener: Arc<dyn TypedTreeChangeListener>,
}

impl TreeChangeAdapter {
    pub fn new(codec: BindingCodec, listener: Arc<dyn TypedTreeChangeListener>) -> Self {
        Self { codec, listener }
    }
}

impl GenericTreeChangeListener for TreeChangeAdapter {
    fn on_changes(&self, changes: &[Candidate]) {
        let snapshot = self.codec.snapshot();
        let mut batch = Vec::with_capacity(changes.len());
        for candidate in changes {
            match splice_codec::decode_path(&snapshot, candidate.root_path()) {
                Ok(path) => batch.push(DataTreeModification::new(
                    Arc::clone(&snapshot),
                    path,
                    candidate.clone(),
                )),
                Err(error) => {
                    warn!(path = %candidate.root_path(), %error, "skipping undecodable change root");
                }
            }
        }
        if !batch.is_empty() {
            self.listener.on_data_tree_changed(&batch);
        }
    }
}

/// Register a typed listener for changes under a typed scope.
///
/// Wildcarded scopes are legal here: they register at the whole list, and
/// the store fans each commit out as one candidate per modified entry.
pub fn register_tree_change_listener(
    codec: &BindingCodec,
    store: &dyn GenericDataStore,
    scope: &TypedPath,
    listener: Arc<dyn TypedTreeChangeListener>,
) -> DispatchResult<ListenerRegistration> {
    let subtree = codec.encode_path(scope)?;
    let adapter = Arc::new(TreeChangeAdapter::new(codec.clone(), listener));
    Ok(store.register_change_listener(subtree, adapter))
}
