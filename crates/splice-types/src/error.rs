//! Error types for the foundation crate.

use crate::ident::NodeId;

/// Errors raised by structural operations on generic values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// A JSON value could not be interpreted as a [`crate::Scalar`].
    #[error("invalid scalar value: {0}")]
    InvalidScalar(String),

    /// Two nodes with different identifiers or shapes were combined.
    #[error("node mismatch: expected {expected}, got {actual}")]
    NodeMismatch { expected: String, actual: String },

    /// A child was inserted under a node that cannot carry children.
    #[error("node {0} cannot carry children")]
    NotAChildBearer(NodeId),

    /// Serialization to or from the typed representation failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}
