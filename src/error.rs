//! Error types for the PDF/A engine.
//!
//! Three families of failure exist:
//! - conformance violations, carrying a stable rule identifier and the offending object,
//! - structural errors (unknown or freed object ids, broken references, bad input),
//! - lifecycle errors (mutating a flushed object, using a closed document).
//!
//! Warnings never surface as an [`Error`]; they are logged and collected on the document.

use crate::compliance::{ConformanceViolation, RuleId};
use crate::object::ObjectRef;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while building, checking or writing a document.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// A conformance rule rejected the operation
    #[error("{0}")]
    Conformance(ConformanceViolation),

    /// Referenced object is unknown, freed, or has a different generation
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Payload access to an object that has already been written
    #[error("Object {0} has already been flushed and can no longer be modified")]
    ObjectFlushed(ObjectRef),

    /// Operation on a document that is closed or failed to close
    #[error("Document is closed")]
    DocumentClosed,

    /// Operation not allowed in the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Parse error at specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Reason for parse failure
        reason: String,
    },

    /// Invalid cross-reference table
    #[error("Invalid cross-reference table")]
    InvalidXref,

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Invalid PDF structure (generic)
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// XMP packet could not be read
    #[error("XMP error: {0}")]
    Xml(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The violation carried by this error, if it is a conformance failure.
    pub fn violation(&self) -> Option<&ConformanceViolation> {
        match self {
            Error::Conformance(v) => Some(v),
            _ => None,
        }
    }

    /// Shortcut for `violation().map(|v| v.rule)`.
    pub fn rule_id(&self) -> Option<RuleId> {
        self.violation().map(|v| v.rule)
    }

    /// True for broken-reference and corrupt-input errors.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::ObjectNotFound(..)
                | Error::ParseError { .. }
                | Error::InvalidXref
                | Error::InvalidPdf(_)
                | Error::InvalidObjectType { .. }
        )
    }
}

impl From<ConformanceViolation> for Error {
    fn from(v: ConformanceViolation) -> Self {
        Error::Conformance(v)
    }
}
