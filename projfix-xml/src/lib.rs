//! XML document model for projfix.
//!
//! Responsibilities:
//! - Parse project files into an owned, editable arena (`quick-xml` underneath).
//! - Provide the edit primitives the normalizer needs (remove, empty, insert-after).
//! - Serialize back without disturbing anything that was not edited.

mod document;
mod error;
pub mod query;

pub use document::{Attribute, Document, ElementData, ElementRef, Indentation, NodeId, NodeKind};
pub use error::{XmlError, XmlResult};
pub use query::ElementLike;
