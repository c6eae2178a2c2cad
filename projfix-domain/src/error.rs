//! Error types for projfix-domain.

use projfix_xml::XmlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    /// A grouping handed to an operation is unusable (no kind, or nodes from elsewhere).
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error(transparent)]
    Xml(#[from] XmlError),
}

impl NormalizeError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        NormalizeError::InvalidArgument {
            message: message.into(),
        }
    }
}

pub type NormalizeResult<T> = Result<T, NormalizeError>;
