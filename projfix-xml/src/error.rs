//! Error types for projfix-xml.
//!
//! Parse failures are reported with enough context to name the offending construct. Edit
//! failures only happen when a caller hands the document a handle it cannot place.

use thiserror::Error;

/// The error type for parsing and editing XML documents.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The underlying reader rejected the input.
    #[error("malformed xml at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    /// An attribute could not be decoded (bad quoting, duplicate name, bad escape).
    #[error("invalid attribute on <{element}>: {message}")]
    Attribute { element: String, message: String },

    #[error("document is not valid UTF-8")]
    Utf8,

    #[error("unexpected closing tag </{name}>")]
    UnexpectedEnd { name: String },

    #[error("element <{name}> is never closed")]
    Unclosed { name: String },

    #[error("document has no root element")]
    NoRoot,

    #[error("document has more than one root element")]
    MultipleRoots,

    /// The handle does not belong to this document.
    #[error("unknown node handle {0}")]
    UnknownNode(usize),

    /// The reference node for a relative insert is not part of the tree.
    #[error("node {0} is not attached to the document")]
    Detached(usize),

    /// A reorder request was not a permutation of the current children.
    #[error("reorder of node {0} must keep the same children")]
    NotAPermutation(usize),
}

/// Result type alias using XmlError.
pub type XmlResult<T> = Result<T, XmlError>;
