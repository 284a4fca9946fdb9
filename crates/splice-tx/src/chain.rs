//! Typed transaction chains.
//!
//! A chain hands out transactions in sequence against one generic chain.
//! The first commit failure moves the chain to `Failed` and reports the
//! failing transaction exactly once; a graceful close reports success
//! exactly once after the last outstanding transaction completes.

use std::sync::{Arc, Mutex};

use splice_codec::BindingCodec;
use splice_store::{ChainListener, GenericDataStore, GenericTransactionChain, StoreError};

use crate::error::{ChainError, ChainResult, CommitError};
use crate::id::TransactionId;
use crate::read::TypedReadTransaction;
use crate::write::{TypedReadWriteTransaction, TypedWriteTransaction};

/// Chain lifecycle callbacks; each fires at most once.
pub trait TypedChainListener: Send + Sync {
    /// First failure of the chain. `tx` names the failing transaction when
    /// the failure surfaced through a typed submit; a chain-wide terminal
    /// failure reported by the store carries no transaction.
    fn on_transaction_failed(&self, tx: Option<TransactionId>, error: &CommitError);

    /// Graceful close with every transaction committed.
    fn on_chain_successful(&self);
}

/// Observable chain state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainStatus {
    Open,
    Closing,
    Closed,
    Failed,
}

struct ChainInner {
    status: ChainStatus,
    in_flight: Option<TransactionId>,
}

pub(crate) struct ChainShared {
    listener: Arc<dyn TypedChainListener>,
    state: Mutex<ChainInner>,
}

impl ChainShared {
    fn new(listener: Arc<dyn TypedChainListener>) -> Self {
        Self {
            listener,
            state: Mutex::new(ChainInner {
                status: ChainStatus::Open,
                in_flight: None,
            }),
        }
    }

    pub(crate) fn begin_submit(&self, id: TransactionId) {
        self.state.lock().expect("chain lock poisoned").in_flight = Some(id);
    }

    pub(crate) fn end_submit(&self) {
        self.state.lock().expect("chain lock poisoned").in_flight = None;
    }

    fn status(&self) -> ChainStatus {
        self.state.lock().expect("chain lock poisoned").status
    }

    fn check_open(&self) -> ChainResult<()> {
        match self.status() {
            ChainStatus::Open => Ok(()),
            ChainStatus::Failed => Err(ChainError::ChainFailed),
            ChainStatus::Closing | ChainStatus::Closed => Err(ChainError::ChainClosed),
        }
    }
}

/// Bridges the generic chain's exactly-once callbacks to the typed
/// listener, attaching the in-flight transaction id when there is one.
struct ChainBridge {
    shared: Arc<ChainShared>,
}

impl ChainListener for ChainBridge {
    fn on_transaction_failed(&self, error: &StoreError) {
        let tx = {
            let mut inner = self.shared.state.lock().expect("chain lock poisoned");
            inner.status = ChainStatus::Failed;
            inner.in_flight.take()
        };
        let cause = CommitError::from(error.clone());
        self.shared.listener.on_transaction_failed(tx, &cause);
    }

    fn on_chain_successful(&self) {
        self.shared.state.lock().expect("chain lock poisoned").status = ChainStatus::Closed;
        self.shared.listener.on_chain_successful();
    }
}

/// Allocates typed transactions against one underlying generic chain.
pub struct TypedTransactionChain {
    codec: BindingCodec,
    delegate: Box<dyn GenericTransactionChain>,
    shared: Arc<ChainShared>,
}

impl TypedTransactionChain {
    pub fn new(
        codec: BindingCodec,
        store: &dyn GenericDataStore,
        listener: Arc<dyn TypedChainListener>,
    ) -> Self {
        let shared = Arc::new(ChainShared::new(listener));
        let delegate = store.create_chain(Arc::new(ChainBridge {
            shared: Arc::clone(&shared),
        }));
        Self {
            codec,
            delegate,
            shared,
        }
    }

    pub fn status(&self) -> ChainStatus {
        self.shared.status()
    }

    pub fn new_read_transaction(&self) -> ChainResult<TypedReadTransaction> {
        self.shared.check_open()?;
        let delegate = self.delegate.new_read_transaction()?;
        Ok(TypedReadTransaction::new(self.codec.clone(), delegate))
    }

    pub fn new_write_transaction(&self) -> ChainResult<TypedWriteTransaction> {
        self.shared.check_open()?;
        let delegate = self.delegate.new_write_transaction()?;
        Ok(TypedWriteTransaction::chained(
            self.codec.clone(),
            delegate,
            Arc::clone(&self.shared),
        ))
    }

    pub fn new_read_write_transaction(&self) -> ChainResult<TypedReadWriteTransaction> {
        self.shared.check_open()?;
        let delegate = self.delegate.new_read_write_transaction()?;
        Ok(TypedReadWriteTransaction::chained(
            self.codec.clone(),
            delegate,
            Arc::clone(&self.shared),
        ))
    }

    /// Move `Open -> Closing`; the success callback fires once the last
    /// outstanding transaction completes (immediately if none).
    pub fn close(&self) {
        {
            let mut inner = self.shared.state.lock().expect("chain lock poisoned");
            if inner.status == ChainStatus::Open {
                inner.status = ChainStatus::Closing;
            }
        }
        self.delegate.close();
    }
}
