//! Error types for the schema crate.

use std::time::Duration;

use splice_types::{ClassId, NodeId};

/// Errors raised by schema lookups and the tracker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// No schema node carries the requested typed class.
    #[error("unknown typed class: {0}")]
    UnknownClass(ClassId),

    /// No schema node with the given identifier exists at the looked-up
    /// position.
    #[error("unknown schema node: {0}")]
    UnknownNode(NodeId),

    /// A bounded wait for a schema generation elapsed.
    #[error("schema did not converge within {waited:?}")]
    Timeout { waited: Duration },

    /// The schema definition itself is inconsistent.
    #[error("invalid schema definition: {0}")]
    InvalidDefinition(String),
}

/// Convenience alias for schema results.
pub type SchemaResult<T> = Result<T, SchemaError>;
