//! Codec core for Splice.
//!
//! The bidirectional, schema-driven mapping between the typed world
//! ([`TypedPath`](splice_types::TypedPath) /
//! [`TypedObject`](splice_types::TypedObject)) and the generic tree
//! ([`GenericPath`](splice_types::GenericPath) /
//! [`GenericNode`](splice_types::GenericNode)). Everything above this crate
//! (transactions, deltas, dispatch) goes through [`BindingCodec`].
//!
//! # Key Types
//!
//! - [`BindingCodec`] / [`CodecConfig`] -- the codec facade
//! - [`encode_path`] / [`decode_path`] -- typed-path translation
//! - [`encode_object`] / [`decode_object`] -- value shaping
//! - [`default_ancestors`] -- parent synthesis for create-missing-parents
//! - RPC and notification codecs in [`ops`]

pub mod codec;
pub mod error;
pub mod object;
pub mod ops;
pub mod path;

pub use codec::{classify, BindingCodec, CodecConfig};
pub use error::{CodecError, CodecResult};
pub use object::{decode_object, default_ancestors, encode_object};
pub use ops::{
    decode_notification, decode_rpc_input, decode_rpc_output, encode_notification,
    encode_rpc_input, encode_rpc_output, notification_path,
};
pub use path::{decode_path, encode_path};
