use std::time::Duration;

use thiserror::Error;

/// Errors produced by the codec core.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A typed path step does not resolve against the current schema.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Generic data does not fit the typed shape the schema describes.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// A typed value does not fit the shape the schema describes.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The bounded wait for a schema generation elapsed.
    #[error("schema wait timed out after {waited:?}")]
    SchemaTimeout { waited: Duration },
}

pub type CodecResult<T> = Result<T, CodecError>;
