//! Service registry for Splice.
//!
//! The top of the stack: typed facades over the generic store and buses,
//! plus the adapter registry that builds and weakly caches one adapter per
//! service type.
//!
//! # Key Types
//!
//! - [`GenericServices`] -- the delegate bundle everything is built from
//! - [`TypedDataBroker`] -- transactions, chains, tree-change listeners
//! - [`TypedNotificationService`] -- typed publish and subscribe
//! - [`TypedRpcConsumerRegistry`] / [`TypedRpcProviderRegistry`] -- RPC
//! - [`AdapterRegistry`] -- weakly-cached per-type adapter lookup

pub mod error;
pub mod registry;
pub mod services;

pub use error::{RegistryError, RegistryResult};
pub use registry::AdapterRegistry;
pub use services::{
    GenericServices, TypedDataBroker, TypedNotificationService, TypedRpcConsumerRegistry,
    TypedRpcProviderRegistry,
};
