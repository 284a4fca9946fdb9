//! Lazy typed change views for Splice.
//!
//! Wraps generic change candidates so typed listeners see
//! [`TypedModification`]s: structural raw kinds collapse to
//! `Write`/`Delete`/`SubtreeModified`, invisible schema layers flatten
//! away, and nothing decodes until an accessor asks for it.
//!
//! # Key Types
//!
//! - [`DataTreeModification`] -- one candidate wrapped for typed use
//! - [`TypedModification`] / [`ModificationKind`] -- the lazy node view
//! - [`DeltaError`] -- caller bugs and decode failures only

pub mod error;
pub mod modification;
pub mod view;

pub use error::{DeltaError, DeltaResult};
pub use modification::{ModificationKind, TypedModification};
pub use view::DataTreeModification;
