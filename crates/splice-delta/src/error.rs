use thiserror::Error;

/// Errors produced by the typed modification view.
///
/// Navigation never fails for "not found"; these cover caller bugs and
/// decode failures only.
#[derive(Debug, Clone, Error)]
pub enum DeltaError {
    /// A typed step whose shape does not fit the schema (an entry step for
    /// a non-list class, a wildcard where data is addressed).
    #[error("invalid step: {0}")]
    InvalidStep(String),

    /// The raw candidate kind has no typed counterpart.
    #[error("unsupported modification: {0}")]
    UnsupportedModification(String),

    /// The candidate data does not decode at its path.
    #[error("decode failed: {0}")]
    Decode(String),
}

pub type DeltaResult<T> = Result<T, DeltaError>;
