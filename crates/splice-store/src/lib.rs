//! Generic store model for Splice.
//!
//! Everything below the typed layer speaks the generic tree: snapshot
//! transactions, transaction chains, subtree change listeners, and the
//! notification and RPC buses. The traits in [`traits`] define the surface;
//! [`memory`] and [`bus`] hold the in-memory implementations the rest of the
//! workspace builds on.
//!
//! # Key Types
//!
//! - [`GenericDataStore`] / [`InMemoryDataStore`] -- transaction factory
//! - [`GenericTransactionChain`] / [`ChainListener`] -- ordered commits
//! - [`GenericTreeChangeListener`] -- subtree change delivery
//! - [`NotificationBus`] / [`RpcBus`] -- dispatch backbones

pub mod bus;
pub mod error;
pub mod memory;
pub mod traits;

pub use bus::{InMemoryNotificationBus, InMemoryRpcBus};
pub use error::{RpcError, RpcResult, StoreError, StoreResult};
pub use memory::InMemoryDataStore;
pub use traits::{
    ChainListener, GenericDataStore, GenericNotification, GenericReadTransaction,
    GenericReadWriteTransaction, GenericTransactionChain, GenericTreeChangeListener,
    GenericWriteTransaction, LazyPayload, ListenerRegistration, NotificationBus,
    NotificationListener, Payload, RpcBus, RpcHandler, RpcRequest,
};
