//! Dispatch adapters for Splice.
//!
//! The bridges between typed listeners/implementations and the generic
//! buses: tree-change delivery, notification publish/listen, and RPC
//! invocation in both directions. Values that stay in-process travel as
//! lazy payloads and skip the codec entirely.
//!
//! # Key Types
//!
//! - [`TreeChangeAdapter`] / [`TypedTreeChangeListener`] -- typed change delivery
//! - [`TypedNotificationPublisher`] / [`TypedNotificationListener`] -- notifications
//! - [`TypedRpcInvoker`] / [`RpcProviderAdapter`] -- RPC consumer and provider
//! - [`LazyNotificationPayload`] / [`LazyRpcPayload`] -- in-process fast paths

pub mod error;
pub mod notification;
pub mod rpc;
pub mod tree;

pub use error::{DispatchError, DispatchResult};
pub use notification::{
    register_notification_listener, LazyNotificationPayload, TypedNotificationListener,
    TypedNotificationPublisher,
};
pub use rpc::{LazyRpcPayload, RpcProviderAdapter, TypedRpcImplementation, TypedRpcInvoker};
pub use tree::{register_tree_change_listener, TreeChangeAdapter, TypedTreeChangeListener};
