//! In-memory data store with snapshot-isolated transactions.
//!
//! Writes stage against a version observed at transaction creation and
//! apply atomically at commit; a tree that advanced in between fails the
//! commit with [`StoreError::Conflict`]. Change listeners are invoked
//! synchronously on the committing thread, in commit order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use tracing::debug;

use splice_candidate::{diff, Candidate, CandidateNode};
use splice_types::{GenericNode, GenericPath, NodeId};

use crate::error::{StoreError, StoreResult};
use crate::traits::{
    ChainListener, GenericDataStore, GenericReadTransaction, GenericReadWriteTransaction,
    GenericTransactionChain, GenericTreeChangeListener, GenericWriteTransaction,
    ListenerRegistration,
};

fn data_root() -> GenericNode {
    GenericNode::container(NodeId::new("splice", "data-root"))
}

struct VersionedRoot {
    version: u64,
    root: GenericNode,
}

struct ListenerEntry {
    id: u64,
    subtree: GenericPath,
    listener: Arc<dyn GenericTreeChangeListener>,
}

impl Clone for ListenerEntry {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            subtree: self.subtree.clone(),
            listener: Arc::clone(&self.listener),
        }
    }
}

struct StoreInner {
    state: RwLock<VersionedRoot>,
    listeners: RwLock<Vec<ListenerEntry>>,
    next_listener: AtomicU64,
}

impl StoreInner {
    fn deliver(&self, change: &CandidateNode) {
        if !change.is_modified() {
            return;
        }
        let listeners = self.listeners.read().expect("listener lock poisoned").clone();
        for entry in listeners {
            if let Some(scoped) = scope_change(change, &entry.subtree) {
                let batch = split_for_delivery(&entry.subtree, scoped);
                if !batch.is_empty() {
                    entry.listener.on_changes(&batch);
                }
            }
        }
    }
}

/// Restrict a whole-tree change to the subtree a listener registered for.
fn scope_change<'a>(root: &'a CandidateNode, subtree: &GenericPath) -> Option<&'a CandidateNode> {
    let mut current = root;
    for step in subtree.steps() {
        current = current.child(step)?;
    }
    current.is_modified().then_some(current)
}

/// A registration on a whole list fans out one candidate per affected
/// entry; anything else delivers the scoped subtree as one candidate.
fn split_for_delivery(subtree: &GenericPath, scoped: &CandidateNode) -> Vec<Candidate> {
    let is_list = matches!(
        scoped.after().or(scoped.before()),
        Some(GenericNode::List { .. })
    );
    if is_list {
        scoped
            .children()
            .iter()
            .filter(|c| c.is_modified())
            .map(|c| Candidate::new(subtree.clone().child(c.step().clone()), c.clone()))
            .collect()
    } else {
        vec![Candidate::new(subtree.clone(), scoped.clone())]
    }
}

/// The in-memory generic data store.
#[derive(Clone)]
pub struct InMemoryDataStore {
    inner: Arc<StoreInner>,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(VersionedRoot {
                    version: 0,
                    root: data_root(),
                }),
                listeners: RwLock::new(Vec::new()),
                next_listener: AtomicU64::new(0),
            }),
        }
    }

    fn snapshot(&self) -> (u64, GenericNode) {
        let state = self.inner.state.read().expect("store lock poisoned");
        (state.version, state.root.clone())
    }
}

impl Default for InMemoryDataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GenericDataStore for InMemoryDataStore {
    fn new_read_transaction(&self) -> Box<dyn GenericReadTransaction> {
        let (_, root) = self.snapshot();
        Box::new(MemoryReadTransaction { snapshot: root })
    }

    fn new_write_transaction(&self) -> Box<dyn GenericWriteTransaction> {
        Box::new(MemoryWriteTransaction::new(Arc::clone(&self.inner)))
    }

    fn new_read_write_transaction(&self) -> Box<dyn GenericReadWriteTransaction> {
        Box::new(MemoryReadWriteTransaction {
            write: MemoryWriteTransaction::new(Arc::clone(&self.inner)),
        })
    }

    fn create_chain(&self, listener: Arc<dyn ChainListener>) -> Box<dyn GenericTransactionChain> {
        Box::new(MemoryTransactionChain {
            store: Arc::clone(&self.inner),
            state: Arc::new(ChainState {
                listener,
                progress: Mutex::new(ChainProgress::default()),
            }),
        })
    }

    fn register_change_listener(
        &self,
        subtree: GenericPath,
        listener: Arc<dyn GenericTreeChangeListener>,
    ) -> ListenerRegistration {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .write()
            .expect("listener lock poisoned")
            .push(ListenerEntry {
                id,
                subtree,
                listener,
            });
        let weak = Arc::downgrade(&self.inner);
        ListenerRegistration::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .listeners
                    .write()
                    .expect("listener lock poisoned")
                    .retain(|e| e.id != id);
            }
        })
    }
}

struct MemoryReadTransaction {
    snapshot: GenericNode,
}

#[async_trait]
impl GenericReadTransaction for MemoryReadTransaction {
    async fn read(&self, path: &GenericPath) -> StoreResult<Option<GenericNode>> {
        Ok(self.snapshot.find_path(path).cloned())
    }
}

enum StagedOp {
    Put(GenericPath, GenericNode),
    Merge(GenericPath, GenericNode),
    Delete(GenericPath),
}

struct MemoryWriteTransaction {
    store: Arc<StoreInner>,
    base_version: u64,
    snapshot: GenericNode,
    ops: Vec<StagedOp>,
    cancelled: bool,
}

impl MemoryWriteTransaction {
    fn new(store: Arc<StoreInner>) -> Self {
        let (base_version, snapshot) = {
            let state = store.state.read().expect("store lock poisoned");
            (state.version, state.root.clone())
        };
        Self {
            store,
            base_version,
            snapshot,
            ops: Vec::new(),
            cancelled: false,
        }
    }

    fn commit_sync(self) -> StoreResult<CandidateNode> {
        if self.cancelled {
            return Err(StoreError::Cancelled);
        }
        let mut state = self.store.state.write().expect("store lock poisoned");
        if state.version != self.base_version {
            return Err(StoreError::Conflict(format!(
                "tree advanced from version {} to {}",
                self.base_version, state.version
            )));
        }
        let mut after = state.root.clone();
        apply_ops(&mut after, &self.ops)?;
        let change = diff(&state.root, &after);
        state.root = after;
        state.version += 1;
        debug!(version = state.version, ops = self.ops.len(), "transaction committed");
        Ok(change)
    }
}

#[async_trait]
impl GenericWriteTransaction for MemoryWriteTransaction {
    fn put(&mut self, path: &GenericPath, node: GenericNode) {
        self.ops.push(StagedOp::Put(path.clone(), node));
    }

    fn merge(&mut self, path: &GenericPath, node: GenericNode) {
        self.ops.push(StagedOp::Merge(path.clone(), node));
    }

    fn delete(&mut self, path: &GenericPath) {
        self.ops.push(StagedOp::Delete(path.clone()));
    }

    fn cancel(&mut self) -> bool {
        if self.cancelled {
            return false;
        }
        self.cancelled = true;
        true
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let store = Arc::clone(&self.store);
        let change = self.commit_sync()?;
        store.deliver(&change);
        Ok(())
    }
}

struct MemoryReadWriteTransaction {
    write: MemoryWriteTransaction,
}

#[async_trait]
impl GenericReadTransaction for MemoryReadWriteTransaction {
    async fn read(&self, path: &GenericPath) -> StoreResult<Option<GenericNode>> {
        // Reads observe the transaction's own staged writes.
        let mut view = self.write.snapshot.clone();
        apply_ops(&mut view, &self.write.ops)?;
        Ok(view.find_path(path).cloned())
    }
}

#[async_trait]
impl GenericWriteTransaction for MemoryReadWriteTransaction {
    fn put(&mut self, path: &GenericPath, node: GenericNode) {
        self.write.put(path, node);
    }

    fn merge(&mut self, path: &GenericPath, node: GenericNode) {
        self.write.merge(path, node);
    }

    fn delete(&mut self, path: &GenericPath) {
        self.write.delete(path);
    }

    fn cancel(&mut self) -> bool {
        self.write.cancel()
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        Box::new(self.write).commit().await
    }
}

impl GenericReadWriteTransaction for MemoryReadWriteTransaction {}

fn apply_ops(root: &mut GenericNode, ops: &[StagedOp]) -> StoreResult<()> {
    for op in ops {
        match op {
            StagedOp::Put(path, node) => apply_put(root, path, node.clone())?,
            StagedOp::Merge(path, node) => apply_merge(root, path, node.clone())?,
            StagedOp::Delete(path) => apply_delete(root, path),
        }
    }
    Ok(())
}

fn apply_put(root: &mut GenericNode, path: &GenericPath, node: GenericNode) -> StoreResult<()> {
    let Some((last, parents)) = path.steps().split_last() else {
        return Err(StoreError::InvalidWrite(
            "cannot replace the tree root".to_string(),
        ));
    };
    if &node.step() != last {
        return Err(StoreError::InvalidWrite(format!(
            "node {} does not sit at {path}",
            node.step()
        )));
    }
    let parent = root
        .find_mut(parents)
        .ok_or_else(|| StoreError::MissingParent(GenericPath::new(parents.to_vec())))?;
    parent
        .set_child(node)
        .map_err(|e| StoreError::InvalidWrite(e.to_string()))
}

fn apply_merge(root: &mut GenericNode, path: &GenericPath, node: GenericNode) -> StoreResult<()> {
    match root.find_mut(path.steps()) {
        Some(existing) => existing
            .merge_from(node)
            .map_err(|e| StoreError::InvalidWrite(e.to_string())),
        None => apply_put(root, path, node),
    }
}

fn apply_delete(root: &mut GenericNode, path: &GenericPath) {
    if let Some((last, parents)) = path.steps().split_last() {
        if let Some(parent) = root.find_mut(parents) {
            parent.remove_child(last);
        }
    }
}

#[derive(Default)]
struct ChainProgress {
    busy: bool,
    outstanding: usize,
    closed: bool,
    failed: bool,
    success_fired: bool,
}

struct ChainState {
    listener: Arc<dyn ChainListener>,
    progress: Mutex<ChainProgress>,
}

impl ChainState {
    fn allocate(&self) -> StoreResult<()> {
        let mut progress = self.progress.lock().expect("chain lock poisoned");
        if progress.failed {
            return Err(StoreError::ChainFailed);
        }
        if progress.busy {
            return Err(StoreError::ChainBusy);
        }
        progress.busy = true;
        progress.outstanding += 1;
        Ok(())
    }

    fn cancelled(&self) {
        let fire_success;
        {
            let mut progress = self.progress.lock().expect("chain lock poisoned");
            progress.busy = false;
            progress.outstanding = progress.outstanding.saturating_sub(1);
            // A close may be waiting on this transaction.
            fire_success = progress.closed
                && progress.outstanding == 0
                && !progress.failed
                && !progress.success_fired;
            if fire_success {
                progress.success_fired = true;
            }
        }
        if fire_success {
            self.listener.on_chain_successful();
        }
    }

    fn completed(&self, result: &StoreResult<()>) {
        let fire_failure;
        let fire_success;
        {
            let mut progress = self.progress.lock().expect("chain lock poisoned");
            progress.busy = false;
            progress.outstanding = progress.outstanding.saturating_sub(1);
            match result {
                Err(_) => {
                    fire_failure = !progress.failed;
                    progress.failed = true;
                    fire_success = false;
                }
                Ok(()) => {
                    fire_failure = false;
                    fire_success = progress.closed
                        && progress.outstanding == 0
                        && !progress.failed
                        && !progress.success_fired;
                    if fire_success {
                        progress.success_fired = true;
                    }
                }
            }
        }
        if fire_failure {
            if let Err(error) = result {
                self.listener.on_transaction_failed(error);
            }
        }
        if fire_success {
            self.listener.on_chain_successful();
        }
    }

    fn close(&self) {
        let fire_success;
        {
            let mut progress = self.progress.lock().expect("chain lock poisoned");
            progress.closed = true;
            fire_success = progress.outstanding == 0
                && !progress.failed
                && !progress.success_fired;
            if fire_success {
                progress.success_fired = true;
            }
        }
        if fire_success {
            self.listener.on_chain_successful();
        }
    }
}

struct MemoryTransactionChain {
    store: Arc<StoreInner>,
    state: Arc<ChainState>,
}

impl GenericTransactionChain for MemoryTransactionChain {
    fn new_read_transaction(&self) -> StoreResult<Box<dyn GenericReadTransaction>> {
        let progress = self.state.progress.lock().expect("chain lock poisoned");
        if progress.failed {
            return Err(StoreError::ChainFailed);
        }
        drop(progress);
        let snapshot = self
            .store
            .state
            .read()
            .expect("store lock poisoned")
            .root
            .clone();
        Ok(Box::new(MemoryReadTransaction { snapshot }))
    }

    fn new_write_transaction(&self) -> StoreResult<Box<dyn GenericWriteTransaction>> {
        self.state.allocate()?;
        Ok(Box::new(ChainedWriteTransaction {
            inner: MemoryWriteTransaction::new(Arc::clone(&self.store)),
            slot: ChainSlot::new(Arc::clone(&self.state)),
        }))
    }

    fn new_read_write_transaction(&self) -> StoreResult<Box<dyn GenericReadWriteTransaction>> {
        self.state.allocate()?;
        Ok(Box::new(ChainedReadWriteTransaction {
            inner: MemoryReadWriteTransaction {
                write: MemoryWriteTransaction::new(Arc::clone(&self.store)),
            },
            slot: ChainSlot::new(Arc::clone(&self.state)),
        }))
    }

    fn close(&self) {
        self.state.close();
    }
}

/// Holds the chain's single allocation slot. Dropping an armed slot (a
/// transaction abandoned without commit or cancel) releases it like a
/// cancellation, so the chain never wedges.
struct ChainSlot {
    state: Arc<ChainState>,
    armed: bool,
}

impl ChainSlot {
    fn new(state: Arc<ChainState>) -> Self {
        Self { state, armed: true }
    }

    fn release(&mut self) {
        if self.armed {
            self.armed = false;
            self.state.cancelled();
        }
    }

    fn disarm(&mut self) -> Arc<ChainState> {
        self.armed = false;
        Arc::clone(&self.state)
    }
}

impl Drop for ChainSlot {
    fn drop(&mut self) {
        self.release();
    }
}

struct ChainedWriteTransaction {
    inner: MemoryWriteTransaction,
    slot: ChainSlot,
}

#[async_trait]
impl GenericWriteTransaction for ChainedWriteTransaction {
    fn put(&mut self, path: &GenericPath, node: GenericNode) {
        self.inner.put(path, node);
    }

    fn merge(&mut self, path: &GenericPath, node: GenericNode) {
        self.inner.merge(path, node);
    }

    fn delete(&mut self, path: &GenericPath) {
        self.inner.delete(path);
    }

    fn cancel(&mut self) -> bool {
        let cancelled = self.inner.cancel();
        if cancelled {
            self.slot.release();
        }
        cancelled
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut this = *self;
        if this.inner.cancelled {
            return Err(StoreError::Cancelled);
        }
        let state = this.slot.disarm();
        let result = Box::new(this.inner).commit().await;
        state.completed(&result);
        result
    }
}

struct ChainedReadWriteTransaction {
    inner: MemoryReadWriteTransaction,
    slot: ChainSlot,
}

#[async_trait]
impl GenericReadTransaction for ChainedReadWriteTransaction {
    async fn read(&self, path: &GenericPath) -> StoreResult<Option<GenericNode>> {
        self.inner.read(path).await
    }
}

#[async_trait]
impl GenericWriteTransaction for ChainedReadWriteTransaction {
    fn put(&mut self, path: &GenericPath, node: GenericNode) {
        self.inner.put(path, node);
    }

    fn merge(&mut self, path: &GenericPath, node: GenericNode) {
        self.inner.merge(path, node);
    }

    fn delete(&mut self, path: &GenericPath) {
        self.inner.delete(path);
    }

    fn cancel(&mut self) -> bool {
        let cancelled = self.inner.cancel();
        if cancelled {
            self.slot.release();
        }
        cancelled
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut this = *self;
        if this.inner.write.cancelled {
            return Err(StoreError::Cancelled);
        }
        let state = this.slot.disarm();
        let result = Box::new(this.inner).commit().await;
        state.completed(&result);
        result
    }
}

impl GenericReadWriteTransaction for ChainedReadWriteTransaction {}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_candidate::ChangeKind;
    use splice_types::Scalar;
    use std::sync::atomic::AtomicUsize;

    fn nid(name: &str) -> NodeId {
        NodeId::new("net", name)
    }

    fn nodes_path() -> GenericPath {
        GenericPath::root().child(splice_types::GenericStep::Node(nid("nodes")))
    }

    fn leaf_path() -> GenericPath {
        nodes_path().child(splice_types::GenericStep::Node(nid("mtu")))
    }

    #[tokio::test]
    async fn put_commit_read_roundtrip() {
        let store = InMemoryDataStore::new();
        let mut tx = store.new_write_transaction();
        tx.put(&nodes_path(), GenericNode::container(nid("nodes")));
        tx.commit().await.unwrap();

        let read = store.new_read_transaction();
        let node = read.read(&nodes_path()).await.unwrap();
        assert_eq!(node, Some(GenericNode::container(nid("nodes"))));
    }

    #[tokio::test]
    async fn put_under_missing_parent_fails_commit() {
        let store = InMemoryDataStore::new();
        let mut tx = store.new_write_transaction();
        tx.put(&leaf_path(), GenericNode::leaf(nid("mtu"), Scalar::Int(1500)));
        let err = tx.commit().await.unwrap_err();
        assert!(matches!(err, StoreError::MissingParent(_)));
    }

    #[tokio::test]
    async fn merge_creates_then_preserves() {
        let store = InMemoryDataStore::new();

        let mut tx = store.new_write_transaction();
        let mut nodes = GenericNode::container(nid("nodes"));
        nodes
            .set_child(GenericNode::leaf(nid("mtu"), Scalar::Int(1500)))
            .unwrap();
        tx.merge(&nodes_path(), nodes);
        tx.commit().await.unwrap();

        // A later merge of an empty container keeps the leaf.
        let mut tx = store.new_write_transaction();
        tx.merge(&nodes_path(), GenericNode::container(nid("nodes")));
        tx.commit().await.unwrap();

        let read = store.new_read_transaction();
        let node = read.read(&leaf_path()).await.unwrap();
        assert_eq!(node, Some(GenericNode::leaf(nid("mtu"), Scalar::Int(1500))));
    }

    #[tokio::test]
    async fn concurrent_commit_conflicts() {
        let store = InMemoryDataStore::new();
        let mut first = store.new_write_transaction();
        let mut second = store.new_write_transaction();
        first.put(&nodes_path(), GenericNode::container(nid("nodes")));
        second.put(&nodes_path(), GenericNode::container(nid("nodes")));

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn cancelled_transaction_does_not_commit() {
        let store = InMemoryDataStore::new();
        let mut tx = store.new_write_transaction();
        tx.put(&nodes_path(), GenericNode::container(nid("nodes")));
        assert!(tx.cancel());
        assert!(!tx.cancel());
        assert!(matches!(
            tx.commit().await.unwrap_err(),
            StoreError::Cancelled
        ));
    }

    #[tokio::test]
    async fn read_write_transaction_sees_own_writes() {
        let store = InMemoryDataStore::new();
        let mut tx = store.new_read_write_transaction();
        tx.put(&nodes_path(), GenericNode::container(nid("nodes")));
        assert!(tx.exists(&nodes_path()).await.unwrap());

        // Nothing visible outside before commit.
        let outside = store.new_read_transaction();
        assert!(!outside.exists(&nodes_path()).await.unwrap());
        tx.commit().await.unwrap();
    }

    struct Recorder {
        seen: Mutex<Vec<(GenericPath, ChangeKind)>>,
    }

    impl GenericTreeChangeListener for Recorder {
        fn on_changes(&self, changes: &[Candidate]) {
            let mut seen = self.seen.lock().unwrap();
            for change in changes {
                seen.push((change.root_path().clone(), change.root().kind()));
            }
        }
    }

    #[tokio::test]
    async fn change_listener_is_scoped_to_subtree() {
        let store = InMemoryDataStore::new();
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        let _reg = store.register_change_listener(
            nodes_path(),
            Arc::clone(&recorder) as Arc<dyn GenericTreeChangeListener>,
        );

        let mut tx = store.new_write_transaction();
        tx.put(&nodes_path(), GenericNode::container(nid("nodes")));
        tx.commit().await.unwrap();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, nodes_path());
        assert_eq!(seen[0].1, ChangeKind::Write);
    }

    #[tokio::test]
    async fn whole_list_registration_fans_out_per_entry() {
        let store = InMemoryDataStore::new();
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        let list_path = nodes_path().child(splice_types::GenericStep::Node(nid("node")));
        let _reg = store.register_change_listener(
            list_path.clone(),
            Arc::clone(&recorder) as Arc<dyn GenericTreeChangeListener>,
        );

        let mut tx = store.new_write_transaction();
        let mut nodes = GenericNode::container(nid("nodes"));
        let mut list = GenericNode::list(nid("node"));
        for name in ["n1", "n2"] {
            list.set_child(GenericNode::list_entry(
                nid("node"),
                [("name".to_string(), Scalar::from(name))],
            ))
            .unwrap();
        }
        nodes.set_child(list).unwrap();
        tx.put(&nodes_path(), nodes);
        tx.commit().await.unwrap();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        for ((path, kind), name) in seen.iter().zip(["n1", "n2"]) {
            let entry_step = splice_types::GenericStep::list_entry(
                nid("node"),
                [("name".to_string(), Scalar::from(name))],
            );
            assert_eq!(path, &list_path.clone().child(entry_step));
            assert_eq!(*kind, ChangeKind::Write);
        }
    }

    #[tokio::test]
    async fn closed_registration_stops_delivery() {
        let store = InMemoryDataStore::new();
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        let reg = store.register_change_listener(
            nodes_path(),
            Arc::clone(&recorder) as Arc<dyn GenericTreeChangeListener>,
        );
        reg.close();

        let mut tx = store.new_write_transaction();
        tx.put(&nodes_path(), GenericNode::container(nid("nodes")));
        tx.commit().await.unwrap();

        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[derive(Default)]
    struct ChainRecorder {
        failures: AtomicUsize,
        successes: AtomicUsize,
    }

    impl ChainListener for ChainRecorder {
        fn on_transaction_failed(&self, _error: &StoreError) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chain_successful(&self) {
            self.successes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn chain_allows_one_outstanding_transaction() {
        let store = InMemoryDataStore::new();
        let listener = Arc::new(ChainRecorder::default());
        let chain = store.create_chain(listener);

        let mut tx = chain.new_write_transaction().unwrap();
        assert!(matches!(
            chain.new_write_transaction(),
            Err(StoreError::ChainBusy)
        ));
        tx.put(&nodes_path(), GenericNode::container(nid("nodes")));
        tx.commit().await.unwrap();

        // The next transaction observes the earlier write.
        let read = chain.new_read_transaction().unwrap();
        assert!(read.exists(&nodes_path()).await.unwrap());
    }

    #[tokio::test]
    async fn chain_failure_fires_listener_once_and_fails_fast() {
        let store = InMemoryDataStore::new();
        let listener = Arc::new(ChainRecorder::default());
        let chain = store.create_chain(Arc::clone(&listener) as Arc<dyn ChainListener>);

        let mut tx = chain.new_write_transaction().unwrap();
        tx.put(&leaf_path(), GenericNode::leaf(nid("mtu"), Scalar::Int(1)));
        assert!(tx.commit().await.is_err());

        assert_eq!(listener.failures.load(Ordering::SeqCst), 1);
        assert!(matches!(
            chain.new_write_transaction(),
            Err(StoreError::ChainFailed)
        ));
        chain.close();
        assert_eq!(listener.successes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn abandoned_chained_transaction_releases_the_chain() {
        let store = InMemoryDataStore::new();
        let listener = Arc::new(ChainRecorder::default());
        let chain = store.create_chain(listener);

        let tx = chain.new_write_transaction().unwrap();
        drop(tx);

        // The slot is free again and the chain has not failed.
        let mut tx = chain.new_write_transaction().unwrap();
        tx.put(&nodes_path(), GenericNode::container(nid("nodes")));
        tx.commit().await.unwrap();

        let read = chain.new_read_transaction().unwrap();
        assert!(read.exists(&nodes_path()).await.unwrap());
    }

    #[tokio::test]
    async fn chain_close_reports_success_once() {
        let store = InMemoryDataStore::new();
        let listener = Arc::new(ChainRecorder::default());
        let chain = store.create_chain(Arc::clone(&listener) as Arc<dyn ChainListener>);

        let mut tx = chain.new_write_transaction().unwrap();
        tx.put(&nodes_path(), GenericNode::container(nid("nodes")));
        tx.commit().await.unwrap();

        chain.close();
        chain.close();
        assert_eq!(listener.successes.load(Ordering::SeqCst), 1);
    }
}
